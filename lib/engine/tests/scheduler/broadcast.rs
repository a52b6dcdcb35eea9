use crate::{
    alice_pattern, generic_pattern, knows, knows_pattern, named, term, var, ScriptedPattern,
    ScriptedSource,
};
use std::sync::Arc;
use tpf_join_engine::error::JoinError;
use tpf_join_engine::{JoinOptions, JoinScheduler, RoundOutcome, StreamId};
use tpf_join_storage::{MemoryFragmentSource, MemoryResultStore};

#[tokio::test]
async fn test_broadcast_only_adds_supplied_bindings() {
    let source = MemoryFragmentSource::new(vec![
        knows("x1", "y1"),
        knows("x2", "y2"),
        named("y1", "Alice"),
    ])
    .with_count_estimate(knows_pattern(), 10);
    let mut scheduler = JoinScheduler::create(
        vec![knows_pattern(), alice_pattern()],
        JoinOptions::new(Arc::new(source)),
    )
    .await
    .unwrap();

    let summary = scheduler.run_broadcast(50).await.unwrap();

    assert!(summary.exhausted);
    assert_eq!(summary.rounds, 2);

    let y = scheduler.cluster(&var("y")).unwrap();
    assert_eq!(y.bindings().len(), 1);
    assert!(y.bindings().contains(&term("y1")));
    assert!(y.bounds().is_none());

    let x = scheduler.cluster(&var("x")).unwrap();
    assert_eq!(x.bindings().len(), 2);
    assert!(x.bounds().is_none());
}

#[tokio::test]
async fn test_broadcast_reads_all_due_streams() {
    let source = Arc::new(ScriptedSource::new(vec![
        ScriptedPattern::generated("a", 2, 1),
        ScriptedPattern::generated("b", 2, 1),
        ScriptedPattern::generated("c", 7, 1),
    ]));
    let mut scheduler =
        JoinScheduler::create(source.patterns(), JoinOptions::new(source.clone()))
            .await
            .unwrap();

    let RoundOutcome::Progress(report) = scheduler.broadcast_round().await.unwrap() else {
        panic!("Expected the round to make progress");
    };

    let read: Vec<StreamId> = report.reads.iter().map(|r| r.stream).collect();
    assert_eq!(read, vec![StreamId::new(0), StreamId::new(1)]);
    assert!(report.settlements.is_empty());
    assert_eq!(report.cost, 2.0);
    assert_eq!(scheduler.streams()[2].cost(), 5.0);
    assert_eq!(source.reads().len(), 2);
}

#[tokio::test]
async fn test_broadcast_stops_at_round_limit() {
    let source = Arc::new(ScriptedSource::new(vec![ScriptedPattern::generated(
        "a", 1, 100,
    )]));
    let mut scheduler =
        JoinScheduler::create(source.patterns(), JoinOptions::new(source.clone()))
            .await
            .unwrap();

    let summary = scheduler.run_broadcast(5).await.unwrap();

    assert_eq!(summary.rounds, 5);
    assert_eq!(summary.reads, 5);
    assert!(!summary.exhausted);
}

#[tokio::test]
async fn test_broadcast_keeps_successful_reads_when_one_fails() {
    let source = Arc::new(ScriptedSource::new(vec![
        ScriptedPattern::generated("a", 2, 2),
        ScriptedPattern::generated("b", 2, 1).failing_page(1),
    ]));
    let store = Arc::new(MemoryResultStore::new());
    let options = JoinOptions::new(source.clone()).with_sink(store.clone());
    let mut scheduler = JoinScheduler::create(source.patterns(), options)
        .await
        .unwrap();

    match scheduler.broadcast_round().await {
        Err(JoinError::Read { pattern, .. }) => assert_eq!(pattern, generic_pattern("b")),
        other => panic!("Expected a read error, got {other:?}"),
    }

    let read = &scheduler.streams()[0];
    assert_eq!(read.triples().len(), 1);
    assert!(scheduler
        .cluster(&var("s"))
        .unwrap()
        .bindings()
        .contains(&term("s0")));
    assert!(store.contains(&read.triples()[0]).await);
    assert_eq!(scheduler.rounds(), 1);
    assert!(!scheduler.streams()[1].ended());
}

#[tokio::test]
async fn test_broadcast_honors_configured_round_limit() {
    let source = Arc::new(ScriptedSource::new(vec![ScriptedPattern::generated(
        "a", 1, 100,
    )]));
    let options = JoinOptions::new(source.clone()).with_max_rounds(2);
    let mut scheduler = JoinScheduler::create(source.patterns(), options)
        .await
        .unwrap();

    let summary = scheduler.run_broadcast(5).await.unwrap();

    assert_eq!(summary.rounds, 2);
    assert!(!summary.exhausted);
}
