//! Boundary scenarios for the mutation engine, exercised against the in-memory
//! `StorageAdapter` fake.

use std::convert::Infallible;

use futures::FutureExt;

use strandline_core::memory::MemoryAdapter;
use strandline_core::{engine, with_retry, DeleteOutcome, EngineError, InsertOutcome, NodeId, Signal, DEFAULT_MAX_ATTEMPTS};

async fn add_node(
    adapter: &MemoryAdapter,
    prev: Option<NodeId>,
) -> Result<InsertOutcome, EngineError<Infallible>> {
    with_retry(adapter, DEFAULT_MAX_ATTEMPTS, move |adapter, session| {
        engine::insert_after(adapter, session, prev).boxed()
    })
    .await
}

async fn remove_node(
    adapter: &MemoryAdapter,
    id: NodeId,
) -> Result<DeleteOutcome, EngineError<Infallible>> {
    with_retry(adapter, DEFAULT_MAX_ATTEMPTS, move |adapter, session| {
        engine::delete(adapter, session, id).boxed()
    })
    .await
}

#[tokio::test]
async fn empty_to_single() {
    let adapter = MemoryAdapter::new();

    let outcome = add_node(&adapter, None).await.expect("insert succeeds");

    assert_eq!(outcome.created_node.prev, None);
    assert_eq!(outcome.created_node.next, None);
    assert_eq!(outcome.created_node.version, 0);
    assert!(outcome.updated_nodes.is_empty());
    assert_eq!(adapter.snapshot().len(), 1);
}

#[tokio::test]
async fn append_after_tail() {
    let adapter = MemoryAdapter::new();
    let a = add_node(&adapter, None).await.unwrap().created_node;

    let outcome = add_node(&adapter, Some(a.id)).await.unwrap();
    let b = outcome.created_node;

    assert_eq!(b.prev, Some(a.id));
    assert_eq!(b.next, None);
    assert_eq!(b.version, 0);

    let delta = outcome.updated_nodes.get(&a.id).expect("a was updated");
    assert_eq!(delta.next, Some(Some(b.id)));

    let a_after = adapter
        .snapshot()
        .into_iter()
        .find(|n| n.id == a.id)
        .unwrap();
    assert_eq!(a_after.next, Some(b.id));
    assert_eq!(a_after.version, 1);
}

#[tokio::test]
async fn insert_in_middle() {
    let adapter = MemoryAdapter::new();
    let a = add_node(&adapter, None).await.unwrap().created_node;
    let b = add_node(&adapter, Some(a.id)).await.unwrap().created_node;

    let outcome = add_node(&adapter, Some(a.id)).await.unwrap();
    let c = outcome.created_node;

    assert_eq!(c.prev, Some(a.id));
    assert_eq!(c.next, Some(b.id));

    let a_delta = outcome.updated_nodes.get(&a.id).unwrap();
    assert_eq!(a_delta.next, Some(Some(c.id)));
    let b_delta = outcome.updated_nodes.get(&b.id).unwrap();
    assert_eq!(b_delta.prev, Some(Some(c.id)));

    let snapshot = adapter.snapshot();
    let a_after = snapshot.iter().find(|n| n.id == a.id).unwrap();
    let b_after = snapshot.iter().find(|n| n.id == b.id).unwrap();
    assert_eq!(a_after.next, Some(c.id));
    assert_eq!(b_after.prev, Some(c.id));
}

#[tokio::test]
async fn delete_middle() {
    let adapter = MemoryAdapter::new();
    let a = add_node(&adapter, None).await.unwrap().created_node;
    let b = add_node(&adapter, Some(a.id)).await.unwrap().created_node;
    let c = add_node(&adapter, Some(b.id)).await.unwrap().created_node;

    let outcome = remove_node(&adapter, b.id).await.unwrap();

    assert_eq!(outcome.deleted_node_id, b.id);
    let a_delta = outcome.updated_nodes.get(&a.id).unwrap();
    assert_eq!(a_delta.next, Some(Some(c.id)));
    let c_delta = outcome.updated_nodes.get(&c.id).unwrap();
    assert_eq!(c_delta.prev, Some(Some(a.id)));

    let snapshot = adapter.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.iter().all(|n| n.id != b.id));
}

#[tokio::test]
async fn delete_single_head_takes_no_neighbour_branch() {
    let adapter = MemoryAdapter::new();
    let a = add_node(&adapter, None).await.unwrap().created_node;

    let outcome = remove_node(&adapter, a.id).await.unwrap();

    assert_eq!(outcome.deleted_node_id, a.id);
    assert!(outcome.updated_nodes.is_empty());
    assert!(adapter.snapshot().is_empty());
}

#[tokio::test]
async fn delete_missing_is_conflict() {
    let adapter = MemoryAdapter::new();
    let missing = uuid::Uuid::new_v4();

    let err = remove_node(&adapter, missing).await.unwrap_err();

    match err {
        EngineError::Signal(Signal::Conflict(message)) => {
            assert!(message.contains("not found"));
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
    assert!(adapter.snapshot().is_empty());
}

#[tokio::test]
async fn insert_after_deleted_reference_is_conflict() {
    let adapter = MemoryAdapter::new();
    let a = add_node(&adapter, None).await.unwrap().created_node;
    remove_node(&adapter, a.id).await.unwrap();

    let err = add_node(&adapter, Some(a.id)).await.unwrap_err();

    match err {
        EngineError::Signal(Signal::Conflict(message)) => {
            assert!(message.contains("reference node was deleted"));
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_same_target_add_both_succeed_with_valid_ordering() {
    let adapter = MemoryAdapter::new();
    let a = add_node(&adapter, None).await.unwrap().created_node;

    let (x, y) = tokio::join!(add_node(&adapter, Some(a.id)), add_node(&adapter, Some(a.id)));

    let x = x.expect("at least one concurrent add succeeds");
    let y = y.expect("both concurrent adds succeed, serialized by the retry driver");

    let snapshot = adapter.snapshot();
    assert_eq!(snapshot.len(), 3);

    // Exactly one of x/y is a.next, and the other follows it.
    let a_after = snapshot.iter().find(|n| n.id == a.id).unwrap();
    assert!(a_after.next == Some(x.created_node.id) || a_after.next == Some(y.created_node.id));
    // Walking from the head visits every node exactly once.
    let mut seen = std::collections::HashSet::new();
    let mut current = Some(a_after.id);
    while let Some(id) = current {
        assert!(seen.insert(id), "cycle detected");
        current = snapshot.iter().find(|n| n.id == id).unwrap().next;
    }
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn concurrent_same_target_delete_exactly_one_succeeds() {
    let adapter = MemoryAdapter::new();
    let a = add_node(&adapter, None).await.unwrap().created_node;
    let b = add_node(&adapter, Some(a.id)).await.unwrap().created_node;
    let c = add_node(&adapter, Some(b.id)).await.unwrap().created_node;

    let (x, y) = tokio::join!(remove_node(&adapter, b.id), remove_node(&adapter, b.id));

    let successes = [x.is_ok(), y.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one concurrent delete of the same node succeeds");

    let snapshot = adapter.snapshot();
    assert_eq!(snapshot.len(), 2);
    let a_after = snapshot.iter().find(|n| n.id == a.id).unwrap();
    let c_after = snapshot.iter().find(|n| n.id == c.id).unwrap();
    assert_eq!(a_after.next, Some(c.id));
    assert_eq!(c_after.prev, Some(a.id));
}

#[tokio::test]
async fn concurrent_add_after_vs_delete_of_same_anchor_never_both_succeed_or_both_fail() {
    let adapter = MemoryAdapter::new();
    let a = add_node(&adapter, None).await.unwrap().created_node;

    let (add, remove) = tokio::join!(add_node(&adapter, Some(a.id)), remove_node(&adapter, a.id));

    // Either the delete wins (the add then fails because its reference node is
    // gone) or the add wins (the delete then fails because a.next changed under
    // it). Both succeeding, or both failing, would violate the list invariants.
    match (add, remove) {
        (Ok(outcome), Err(EngineError::Signal(Signal::Conflict(_)))) => {
            let snapshot = adapter.snapshot();
            assert_eq!(snapshot.len(), 2);
            assert!(snapshot.iter().any(|n| n.id == a.id));
            assert!(snapshot.iter().any(|n| n.id == outcome.created_node.id));
        }
        (Err(EngineError::Signal(Signal::Conflict(message))), Ok(outcome)) => {
            assert!(message.contains("reference node was deleted"));
            assert_eq!(outcome.deleted_node_id, a.id);
            assert!(adapter.snapshot().is_empty());
        }
        other => panic!("expected exactly one side to succeed, got {other:?}"),
    }
}
