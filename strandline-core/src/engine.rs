use std::collections::HashMap;

use uuid::Uuid;

use crate::node::{Node, NodeId, PointerDelta};
use crate::signal::{EngineError, Signal};
use crate::storage::{Predicate, PointerMutation, StorageAdapter};

/// The result of a successful `insert_after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    pub created_node: Node,
    pub updated_nodes: HashMap<NodeId, PointerDelta>,
}

/// The result of a successful `delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted_node_id: NodeId,
    pub updated_nodes: HashMap<NodeId, PointerDelta>,
}

/// Inserts a new node after `prev_id`, or at the head of the list if `prev_id` is
/// `None`. Must run inside a transaction opened by the retry driver; never opens or
/// commits one itself.
pub async fn insert_after<A>(
    adapter: &A,
    session: &mut A::Session,
    prev_id: Option<NodeId>,
) -> Result<InsertOutcome, EngineError<A::Error>>
where
    A: StorageAdapter,
{
    match prev_id {
        None => insert_at_head(adapter, session).await,
        Some(prev_id) => insert_after_node(adapter, session, prev_id).await,
    }
}

async fn insert_at_head<A>(
    adapter: &A,
    session: &mut A::Session,
) -> Result<InsertOutcome, EngineError<A::Error>>
where
    A: StorageAdapter,
{
    let head = adapter.find_head(session).await.map_err(EngineError::Storage)?;

    let new_id = Uuid::new_v4();
    let created_node = Node::new(new_id, None, head.map(|h| h.id));

    let mut updated_nodes = HashMap::new();
    if let Some(head) = head {
        let predicate = Predicate::version(head.version).with_prev(None);
        let mutation = PointerMutation::set_prev(Some(new_id));
        let updated = adapter
            .conditional_update(session, head.id, predicate, mutation)
            .await
            .map_err(EngineError::Storage)?;
        if updated.is_none() {
            return Err(Signal::Retry.into());
        }
        updated_nodes.insert(
            head.id,
            PointerDelta {
                prev: Some(Some(new_id)),
                next: None,
            },
        );
    }

    adapter
        .insert(session, created_node)
        .await
        .map_err(EngineError::Storage)?;

    Ok(InsertOutcome {
        created_node,
        updated_nodes,
    })
}

async fn insert_after_node<A>(
    adapter: &A,
    session: &mut A::Session,
    prev_id: NodeId,
) -> Result<InsertOutcome, EngineError<A::Error>>
where
    A: StorageAdapter,
{
    let prev = adapter
        .find(session, prev_id)
        .await
        .map_err(EngineError::Storage)?
        .ok_or_else(|| Signal::Conflict("reference node was deleted".to_string()))?;

    let next_id = prev.next;
    let new_id = Uuid::new_v4();
    let created_node = Node::new(new_id, Some(prev.id), next_id);

    let mut updated_nodes = HashMap::new();

    let predicate = Predicate::version(prev.version).with_next(next_id);
    let mutation = PointerMutation::set_next(Some(new_id));
    let updated = adapter
        .conditional_update(session, prev.id, predicate, mutation)
        .await
        .map_err(EngineError::Storage)?;
    if updated.is_none() {
        return Err(Signal::Retry.into());
    }
    updated_nodes.insert(
        prev.id,
        PointerDelta {
            prev: None,
            next: Some(Some(new_id)),
        },
    );

    if let Some(next_id) = next_id {
        let next = adapter
            .find(session, next_id)
            .await
            .map_err(EngineError::Storage)?
            .ok_or_else(|| Signal::Conflict("next node deleted concurrently".to_string()))?;

        let predicate = Predicate::version(next.version).with_prev(Some(prev.id));
        let mutation = PointerMutation::set_prev(Some(new_id));
        let updated = adapter
            .conditional_update(session, next.id, predicate, mutation)
            .await
            .map_err(EngineError::Storage)?;
        if updated.is_none() {
            return Err(Signal::Retry.into());
        }
        updated_nodes.insert(
            next.id,
            PointerDelta {
                prev: Some(Some(new_id)),
                next: None,
            },
        );
    }

    adapter
        .insert(session, created_node)
        .await
        .map_err(EngineError::Storage)?;

    Ok(InsertOutcome {
        created_node,
        updated_nodes,
    })
}

/// Deletes the node identified by `node_id`. Must run inside a transaction opened by
/// the retry driver; never opens or commits one itself.
pub async fn delete<A>(
    adapter: &A,
    session: &mut A::Session,
    node_id: NodeId,
) -> Result<DeleteOutcome, EngineError<A::Error>>
where
    A: StorageAdapter,
{
    let target = adapter
        .find(session, node_id)
        .await
        .map_err(EngineError::Storage)?
        .ok_or_else(|| Signal::Conflict("node not found or already deleted".to_string()))?;

    let mut updated_nodes = HashMap::new();

    if let Some(prev_id) = target.prev {
        let prev = adapter
            .find(session, prev_id)
            .await
            .map_err(EngineError::Storage)?
            .ok_or_else(|| Signal::Conflict("previous node deleted concurrently".to_string()))?;

        let predicate = Predicate::version(prev.version).with_next(Some(node_id));
        let mutation = PointerMutation::set_next(target.next);
        let updated = adapter
            .conditional_update(session, prev.id, predicate, mutation)
            .await
            .map_err(EngineError::Storage)?;
        if updated.is_none() {
            return Err(Signal::Retry.into());
        }
        updated_nodes.insert(
            prev.id,
            PointerDelta {
                prev: None,
                next: Some(target.next),
            },
        );
    }

    if let Some(next_id) = target.next {
        let next = adapter
            .find(session, next_id)
            .await
            .map_err(EngineError::Storage)?
            .ok_or_else(|| Signal::Conflict("next node deleted concurrently".to_string()))?;

        let predicate = Predicate::version(next.version).with_prev(Some(node_id));
        let mutation = PointerMutation::set_prev(target.prev);
        let updated = adapter
            .conditional_update(session, next.id, predicate, mutation)
            .await
            .map_err(EngineError::Storage)?;
        if updated.is_none() {
            return Err(Signal::Retry.into());
        }
        updated_nodes.insert(
            next.id,
            PointerDelta {
                prev: Some(target.prev),
                next: None,
            },
        );
    }

    let deleted = adapter
        .conditional_delete(session, node_id, target.version)
        .await
        .map_err(EngineError::Storage)?;
    if !deleted {
        return Err(Signal::Retry.into());
    }

    Ok(DeleteOutcome {
        deleted_node_id: node_id,
        updated_nodes,
    })
}
