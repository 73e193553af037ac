//! An in-memory [`StorageAdapter`] fake, used by this crate's property tests and
//! reusable by downstream crates under the `testing` feature. It applies
//! conditional writes directly against a shared map (so concurrent sessions
//! genuinely interleave, the way concurrent connections do against real rows) and
//! keeps a per-session undo log so that [`StorageAdapter::rollback`] can undo a
//! failed attempt's partial writes.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::node::{Node, NodeId};
use crate::storage::{Predicate, PointerMutation, StorageAdapter};

#[derive(Debug, Clone, Copy)]
enum Undo {
    Insert(NodeId),
    Restore(Node),
}

/// A freshly opened transaction against a [`MemoryAdapter`].
#[derive(Debug, Default)]
pub struct MemorySession {
    undo_log: Vec<Undo>,
}

/// Shared, process-local node store. Cheap to clone (clones the `Arc`).
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    nodes: Arc<Mutex<HashMap<NodeId, Node>>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every persisted node, for assertions in tests.
    pub fn snapshot(&self) -> Vec<Node> {
        self.nodes.lock().expect("lock poisoned").values().copied().collect()
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    type Session = MemorySession;
    type Error = Infallible;

    async fn begin(&self) -> Result<Self::Session, Self::Error> {
        Ok(MemorySession::default())
    }

    async fn commit(&self, _session: Self::Session) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn rollback(&self, session: Self::Session) -> Result<(), Self::Error> {
        let mut nodes = self.nodes.lock().expect("lock poisoned");
        for undo in session.undo_log.into_iter().rev() {
            match undo {
                Undo::Insert(id) => {
                    nodes.remove(&id);
                }
                Undo::Restore(node) => {
                    nodes.insert(node.id, node);
                }
            }
        }
        Ok(())
    }

    async fn find(
        &self,
        _session: &mut Self::Session,
        id: NodeId,
    ) -> Result<Option<Node>, Self::Error> {
        Ok(self.nodes.lock().expect("lock poisoned").get(&id).copied())
    }

    async fn find_head(&self, _session: &mut Self::Session) -> Result<Option<Node>, Self::Error> {
        Ok(self
            .nodes
            .lock()
            .expect("lock poisoned")
            .values()
            .find(|node| node.prev.is_none())
            .copied())
    }

    async fn find_all(&self, _session: &mut Self::Session) -> Result<Vec<Node>, Self::Error> {
        Ok(self.nodes.lock().expect("lock poisoned").values().copied().collect())
    }

    async fn insert(&self, session: &mut Self::Session, node: Node) -> Result<(), Self::Error> {
        self.nodes.lock().expect("lock poisoned").insert(node.id, node);
        session.undo_log.push(Undo::Insert(node.id));
        Ok(())
    }

    async fn conditional_update(
        &self,
        session: &mut Self::Session,
        id: NodeId,
        predicate: Predicate,
        mutation: PointerMutation,
    ) -> Result<Option<Node>, Self::Error> {
        let mut nodes = self.nodes.lock().expect("lock poisoned");
        let Some(current) = nodes.get(&id).copied() else {
            return Ok(None);
        };
        if current.version != predicate.version {
            return Ok(None);
        }
        if let Some(expected) = predicate.prev {
            if current.prev != expected {
                return Ok(None);
            }
        }
        if let Some(expected) = predicate.next {
            if current.next != expected {
                return Ok(None);
            }
        }

        let mut updated = current;
        if let Some(prev) = mutation.prev {
            updated.prev = prev;
        }
        if let Some(next) = mutation.next {
            updated.next = next;
        }
        updated.version += 1;
        nodes.insert(id, updated);
        drop(nodes);

        session.undo_log.push(Undo::Restore(current));
        Ok(Some(updated))
    }

    async fn conditional_delete(
        &self,
        session: &mut Self::Session,
        id: NodeId,
        version: i64,
    ) -> Result<bool, Self::Error> {
        let mut nodes = self.nodes.lock().expect("lock poisoned");
        let Some(current) = nodes.get(&id).copied() else {
            return Ok(false);
        };
        if current.version != version {
            return Ok(false);
        }
        nodes.remove(&id);
        drop(nodes);

        session.undo_log.push(Undo::Restore(current));
        Ok(true)
    }

    fn is_serialization_conflict(&self, _error: &Self::Error) -> bool {
        false
    }
}
