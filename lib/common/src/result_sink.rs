use crate::error::SinkError;
use async_trait::async_trait;
use std::fmt::Debug;
use tpf_join_model::Triple;

/// Incorporates the triples surfaced by the join engine into a queryable result set.
///
/// The engine calls [ResultSink::apply] at most once per round. Removals refer to triples that
/// have been added in an earlier round and must be applied before the additions.
#[async_trait]
pub trait ResultSink: Debug + Send + Sync {
    /// Applies a batch of added and a batch of removed triples.
    async fn apply(&self, added: &[Triple], removed: &[Triple]) -> Result<(), SinkError>;
}
