use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, globally unique identifier for a node. Stable for the node's entire life.
pub type NodeId = Uuid;

/// A node of the persisted doubly-linked list.
///
/// Nodes carry structural pointers and a version counter only — no payload, no
/// cursor/presence data. `prev`/`next` are opaque foreign keys into the same
/// collection, never in-memory owning references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    /// Strictly monotonically increasing on every committed mutation of this node.
    /// Newly created nodes start at 0.
    pub version: i64,
}

impl Node {
    /// Constructs a fresh, not-yet-persisted node at version 0.
    pub fn new(id: NodeId, prev: Option<NodeId>, next: Option<NodeId>) -> Self {
        Node {
            id,
            prev,
            next,
            version: 0,
        }
    }
}

/// The subset of a node's fields that a neighbour update can touch, keyed by the
/// neighbour's id. Carried back to callers so they can apply the delta without a
/// re-read (`addNode`/`removeNode` results on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PointerDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<Option<NodeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Option<NodeId>>,
}
