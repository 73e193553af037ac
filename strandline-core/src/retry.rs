use futures::future::BoxFuture;

use crate::signal::{EngineError, Signal};
use crate::storage::StorageAdapter;

/// Default retry bound for [`with_retry`]. Arbitrary; configurable per call.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Runs `op` inside a fresh transaction, retrying on [`Signal::Retry`] up to
/// `max_attempts` times.
///
/// `op` receives the adapter and a freshly opened session on every attempt; nothing
/// it read or wrote in a failed attempt is visible to the next one — each attempt
/// gets fresh reads against a fresh transaction. [`Signal::Conflict`] and any
/// [`EngineError::Storage`] are surfaced to the caller immediately, without retry.
/// Exhausting the attempt budget itself becomes a [`Signal::Conflict`].
pub async fn with_retry<A, R, F>(
    adapter: &A,
    max_attempts: usize,
    mut op: F,
) -> Result<R, EngineError<A::Error>>
where
    A: StorageAdapter,
    F: for<'a> FnMut(&'a A, &'a mut A::Session) -> BoxFuture<'a, Result<R, EngineError<A::Error>>>,
{
    for attempt in 1..=max_attempts {
        let mut session = adapter.begin().await.map_err(EngineError::Storage)?;

        match op(adapter, &mut session).await {
            Ok(result) => match adapter.commit(session).await {
                Ok(()) => return Ok(result),
                Err(err) if adapter.is_serialization_conflict(&err) => {
                    if attempt == max_attempts {
                        break;
                    }
                    continue;
                }
                Err(err) => return Err(EngineError::Storage(err)),
            },
            Err(EngineError::Signal(Signal::Conflict(message))) => {
                let _ = adapter.rollback(session).await;
                return Err(Signal::Conflict(message).into());
            }
            Err(EngineError::Signal(Signal::Retry)) => {
                let _ = adapter.rollback(session).await;
                if attempt == max_attempts {
                    break;
                }
                continue;
            }
            Err(err @ EngineError::Storage(_)) => {
                let _ = adapter.rollback(session).await;
                return Err(err);
            }
        }
    }

    Err(Signal::Conflict("could not complete operation after several retries".to_string()).into())
}
