//! The concurrency protocol for mutating a version-stamped, persistent doubly-linked
//! list of anonymous nodes.
//!
//! This crate is the CORE described by the Strandline specification: the
//! optimistic-locking [`engine`] (insert-after, delete), the [`retry`] driver that
//! re-runs a mutation on a lost race, the [`storage`] adapter contract the engine is
//! written against, and the [`node`] entity itself. Everything outside this crate —
//! connection handling, WebSocket framing, broadcasting, configuration — is a
//! collaborator that drives this core through [`retry::with_retry`].

pub mod engine;
pub mod node;
pub mod retry;
pub mod signal;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use engine::{DeleteOutcome, InsertOutcome};
pub use node::{Node, NodeId, PointerDelta};
pub use retry::{with_retry, DEFAULT_MAX_ATTEMPTS};
pub use signal::{EngineError, Signal};
pub use storage::{Predicate, PointerMutation, StorageAdapter};
