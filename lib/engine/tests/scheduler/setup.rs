use crate::{alice_pattern, ex, knows, knows_pattern, named, var, ScriptedPattern, ScriptedSource};
use std::sync::Arc;
use tpf_join_engine::error::JoinError;
use tpf_join_engine::{JoinOptions, JoinScheduler, StreamId};
use tpf_join_model::{triple_pattern, vocab::rdf, NamedNode};
use tpf_join_storage::MemoryFragmentSource;

#[tokio::test]
async fn test_create_registers_streams_in_clusters() {
    let p1 = triple_pattern(ex("alice"), NamedNode::new(crate::KNOWS).unwrap(), var("y"));
    let p2 = alice_pattern();
    let p3 = triple_pattern(var("z"), rdf::TYPE.into_owned(), ex("Person"));
    let source = MemoryFragmentSource::new(vec![knows("alice", "bob"), named("bob", "Alice")]);

    let scheduler = JoinScheduler::create(
        vec![p1, p2, p3],
        JoinOptions::new(Arc::new(source)),
    )
    .await
    .unwrap();

    assert_eq!(scheduler.streams().len(), 3);
    assert_eq!(scheduler.clusters().count(), 2);
    assert_eq!(
        scheduler.cluster(&var("y")).unwrap().members(),
        &[StreamId::new(0), StreamId::new(1)]
    );
    assert_eq!(
        scheduler.cluster(&var("z")).unwrap().members(),
        &[StreamId::new(2)]
    );
}

#[tokio::test]
async fn test_create_uses_metadata_as_initial_cost() {
    let source = ScriptedSource::new(vec![
        ScriptedPattern::generated("a", 10, 1),
        ScriptedPattern::generated("b", 3, 1),
    ]);

    let scheduler = JoinScheduler::create(source.patterns(), JoinOptions::new(Arc::new(source)))
        .await
        .unwrap();

    let costs: Vec<f64> = scheduler.streams().iter().map(|s| s.cost()).collect();
    assert_eq!(costs, vec![10.0, 3.0]);
    assert!(scheduler.streams().iter().all(|s| !s.ended()));
}

#[tokio::test]
async fn test_create_designates_cheapest_member_as_supplier() {
    let source = MemoryFragmentSource::new(vec![
        knows("a", "b"),
        knows("c", "d"),
        named("b", "Alice"),
    ]);

    let scheduler = JoinScheduler::create(
        vec![knows_pattern(), alice_pattern()],
        JoinOptions::new(Arc::new(source)),
    )
    .await
    .unwrap();

    let knows_stream = scheduler.stream(StreamId::new(0)).unwrap();
    let alice_stream = scheduler.stream(StreamId::new(1)).unwrap();
    assert!(knows_stream.supplies(&var("x")));
    assert!(!knows_stream.supplies(&var("y")));
    assert!(alice_stream.supplies(&var("y")));
}

#[tokio::test]
async fn test_create_fails_if_metadata_is_unavailable() {
    let source = ScriptedSource::new(vec![
        ScriptedPattern::generated("a", 10, 1),
        ScriptedPattern::generated("b", 3, 1).failing_metadata(),
    ]);
    let patterns = source.patterns();

    let result = JoinScheduler::create(patterns, JoinOptions::new(Arc::new(source))).await;

    match result {
        Err(JoinError::MetadataFetch { pattern, .. }) => {
            assert_eq!(pattern, crate::generic_pattern("b"));
        }
        other => panic!("Expected a metadata error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_without_patterns_is_exhausted() {
    let source = MemoryFragmentSource::new(Vec::new());
    let mut scheduler = JoinScheduler::create(Vec::new(), JoinOptions::new(Arc::new(source)))
        .await
        .unwrap();

    let summary = scheduler.run().await.unwrap();
    assert!(summary.exhausted);
    assert_eq!(summary.rounds, 0);
    assert_eq!(scheduler.clusters().count(), 0);
}
