use std::sync::Arc;
use tpf_join_common::{FragmentSource, ResultSink};

/// Holds the configuration of a [JoinScheduler](crate::JoinScheduler).
#[derive(Clone, Debug)]
pub struct JoinOptions {
    /// The source that answers the triple patterns.
    pub source: Arc<dyn FragmentSource>,
    /// Receives the triples added and removed in every round.
    pub sink: Option<Arc<dyn ResultSink>>,
    /// Stops a run after this many rounds, even if some streams are not exhausted yet.
    ///
    /// Also caps [JoinScheduler::run_broadcast](crate::JoinScheduler::run_broadcast) if it is
    /// smaller than the limit passed there.
    pub max_rounds: Option<usize>,
    /// Whether streams drop triples outside the complete domain of one of their variables once
    /// that domain is known.
    pub apply_bound_filters: bool,
}

impl JoinOptions {
    /// Creates the default options for reading from `source`.
    pub fn new(source: Arc<dyn FragmentSource>) -> Self {
        Self {
            source,
            sink: None,
            max_rounds: None,
            apply_bound_filters: true,
        }
    }

    /// Hands the triples of every round to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Limits a run to `max_rounds` rounds.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    /// Enables or disables filtering by complete variable domains.
    #[must_use]
    pub fn with_bound_filters(mut self, apply_bound_filters: bool) -> Self {
        self.apply_bound_filters = apply_bound_filters;
        self
    }
}
