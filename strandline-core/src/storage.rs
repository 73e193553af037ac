use async_trait::async_trait;

use crate::node::{Node, NodeId};

/// A conjunction of field-equals checks that a [`StorageAdapter::conditional_update`]
/// or [`StorageAdapter::conditional_delete`] validates against the persisted row
/// before applying anything. `version` is always checked; `prev`/`next` are checked
/// only when `Some`, since not every operation depends on a neighbour's pointer —
/// but every operation whose correctness depends on a pointer's continuity (not just
/// the version counter) MUST set it, to rule out a predicate that rechecks a stale
/// version against a pointer a concurrent writer already moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Predicate {
    pub version: i64,
    pub prev: Option<Option<NodeId>>,
    pub next: Option<Option<NodeId>>,
}

impl Predicate {
    pub fn version(version: i64) -> Self {
        Predicate {
            version,
            ..Default::default()
        }
    }

    pub fn with_prev(mut self, prev: Option<NodeId>) -> Self {
        self.prev = Some(prev);
        self
    }

    pub fn with_next(mut self, next: Option<NodeId>) -> Self {
        self.next = Some(next);
        self
    }
}

/// The pointer fields a [`StorageAdapter::conditional_update`] call assigns. A field
/// left `None` is left untouched. `version` is never part of the mutation: every
/// successful conditional update bumps it by exactly one, unconditionally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerMutation {
    pub prev: Option<Option<NodeId>>,
    pub next: Option<Option<NodeId>>,
}

impl PointerMutation {
    pub fn set_prev(prev: Option<NodeId>) -> Self {
        PointerMutation {
            prev: Some(prev),
            next: None,
        }
    }

    pub fn set_next(next: Option<NodeId>) -> Self {
        PointerMutation {
            prev: None,
            next: Some(next),
        }
    }
}

/// Storage adapter contract consumed by the mutation engine.
///
/// A `StorageAdapter` persists nodes, supports atomic conditional updates predicated
/// on a version (and optionally pointer) field, and hosts serializable
/// multi-statement transactions with automatic rollback on abort. It is the only
/// seam through which the engine touches shared mutable state; no in-process lock
/// protects the graph, so every invariant the engine relies on must be enforced by
/// the predicate passed into `conditional_update`/`conditional_delete`.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// A single transactional session, opened by [`StorageAdapter::begin`] and
    /// consumed by exactly one of [`StorageAdapter::commit`] or
    /// [`StorageAdapter::rollback`].
    type Session: Send;
    /// Errors this adapter's backing store can raise. [`StorageAdapter::is_conflict`]
    /// distinguishes a transient serialization conflict (treated as
    /// [`crate::signal::Signal::Retry`]) from every other error (propagated
    /// unchanged).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Opens a fresh transactional session with at least snapshot-isolation
    /// semantics and commit-time conflict detection.
    async fn begin(&self) -> Result<Self::Session, Self::Error>;

    /// Commits a session. May fail with a transient serialization conflict.
    async fn commit(&self, session: Self::Session) -> Result<(), Self::Error>;

    /// Aborts a session, discarding every write made within it.
    async fn rollback(&self, session: Self::Session) -> Result<(), Self::Error>;

    /// Reads a node by id within the session.
    async fn find(
        &self,
        session: &mut Self::Session,
        id: NodeId,
    ) -> Result<Option<Node>, Self::Error>;

    /// Returns the node with `prev = None`, or `None` if the list is empty.
    async fn find_head(&self, session: &mut Self::Session) -> Result<Option<Node>, Self::Error>;

    /// Returns every persisted node. Used only by the snapshot provider; never
    /// called from within a mutation.
    async fn find_all(&self, session: &mut Self::Session) -> Result<Vec<Node>, Self::Error>;

    /// Stores a freshly constructed node.
    async fn insert(&self, session: &mut Self::Session, node: Node) -> Result<(), Self::Error>;

    /// Atomically applies `mutation` (plus an unconditional version increment) iff
    /// the persisted row for `id` matches `predicate`. Returns the post-mutation
    /// node on success, `None` if the predicate failed. Must not partially apply.
    async fn conditional_update(
        &self,
        session: &mut Self::Session,
        id: NodeId,
        predicate: Predicate,
        mutation: PointerMutation,
    ) -> Result<Option<Node>, Self::Error>;

    /// Atomically deletes the row for `id` iff its version matches `version`.
    async fn conditional_delete(
        &self,
        session: &mut Self::Session,
        id: NodeId,
        version: i64,
    ) -> Result<bool, Self::Error>;

    /// Does this error represent a transient, commit-time write conflict (e.g. a
    /// Postgres `40001` serialization failure)? The retry driver treats `true`
    /// identically to a failed predicate.
    fn is_serialization_conflict(&self, error: &Self::Error) -> bool;
}
