//! Returns the current set of nodes to a newly attached session, via a single
//! read-only pass over the storage adapter. Needs no isolation stronger than a
//! consistent read of committed state, so it never touches the retry driver.

use strandline_core::{Node, StorageAdapter};

pub async fn current_nodes<A>(adapter: &A) -> Result<Vec<Node>, A::Error>
where
    A: StorageAdapter,
{
    let mut session = adapter.begin().await?;
    let nodes = adapter.find_all(&mut session).await?;
    adapter.commit(session).await?;
    Ok(nodes)
}
