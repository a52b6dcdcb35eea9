use crate::{knows, named};
use tpf_join_common::ResultSink;
use tpf_join_storage::MemoryResultStore;

#[tokio::test]
async fn test_apply_added_triples() {
    let store = MemoryResultStore::new();

    store
        .apply(&[knows("a", "b"), named("b", "Alice")], &[])
        .await
        .unwrap();

    assert_eq!(store.len().await, 2);
    assert!(store.contains(&knows("a", "b")).await);
}

#[tokio::test]
async fn test_apply_duplicate_triples_no_effect() {
    let store = MemoryResultStore::new();

    store.apply(&[knows("a", "b")], &[]).await.unwrap();
    store.apply(&[knows("a", "b")], &[]).await.unwrap();

    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_apply_removed_triples() {
    let store = MemoryResultStore::new();

    store
        .apply(&[knows("a", "b"), knows("a", "c")], &[])
        .await
        .unwrap();
    store.apply(&[], &[knows("a", "b")]).await.unwrap();

    assert_eq!(store.triples().await, vec![knows("a", "c")]);
}

#[tokio::test]
async fn test_remove_unknown_triple_no_effect() {
    let store = MemoryResultStore::new();

    store.apply(&[], &[knows("a", "b")]).await.unwrap();

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_removals_are_applied_before_additions() {
    let store = MemoryResultStore::new();

    store
        .apply(&[knows("a", "b")], &[knows("a", "b")])
        .await
        .unwrap();

    assert!(store.contains(&knows("a", "b")).await);
}
