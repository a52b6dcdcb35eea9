use async_trait::async_trait;
use rustc_hash::FxHashSet;
use tokio::sync::RwLock;
use tpf_join_common::error::SinkError;
use tpf_join_common::ResultSink;
use tpf_join_model::Triple;

/// A [ResultSink] that keeps the accepted triples in memory.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    triples: RwLock<FxHashSet<Triple>>,
}

impl MemoryResultStore {
    /// Creates a new empty [MemoryResultStore].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of triples in the store.
    pub async fn len(&self) -> usize {
        self.triples.read().await.len()
    }

    /// Returns whether the store holds no triples.
    pub async fn is_empty(&self) -> bool {
        self.triples.read().await.is_empty()
    }

    /// Returns whether `triple` is part of the store.
    pub async fn contains(&self, triple: &Triple) -> bool {
        self.triples.read().await.contains(triple)
    }

    /// Returns all triples of the store, ordered by their N-Triples serialization.
    pub async fn triples(&self) -> Vec<Triple> {
        let mut triples: Vec<Triple> = self.triples.read().await.iter().cloned().collect();
        triples.sort_by_cached_key(ToString::to_string);
        triples
    }
}

#[async_trait]
impl ResultSink for MemoryResultStore {
    async fn apply(&self, added: &[Triple], removed: &[Triple]) -> Result<(), SinkError> {
        let mut triples = self.triples.write().await;
        for triple in removed {
            triples.remove(triple);
        }
        triples.extend(added.iter().cloned());
        Ok(())
    }
}
