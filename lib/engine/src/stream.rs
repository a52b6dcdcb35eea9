use crate::cluster::{BoundDomain, BoundsReceiver};
use crate::error::JoinError;
use rustc_hash::FxHashSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tpf_join_common::error::SourceError;
use tpf_join_common::{FragmentMetadata, FragmentPage, FragmentSource, PageNumber};
use tpf_join_model::{
    pattern_matches, pattern_variables, project, variable_position, InvalidVariableError, Term,
    Triple, TriplePattern, TriplePosition, Variable,
};
use tracing::{debug, trace};

/// Identifies a [PatternStream] within a [JoinScheduler](crate::JoinScheduler). The id is the
/// index of the pattern in the list of patterns the scheduler was created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(usize);

impl StreamId {
    /// Creates the id of the stream of the `index`-th pattern.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the index of the pattern of this stream.
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for StreamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The triples a single read surfaced and retracted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamDelta {
    /// Matches that have not been surfaced before.
    pub added: Vec<Triple>,
    /// Previously surfaced matches that are no longer valid.
    pub removed: Vec<Triple>,
}

impl StreamDelta {
    /// Returns whether the read neither added nor removed a triple.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The complete domain of one variable of the pattern, as received from its cluster.
#[derive(Debug)]
struct BoundFilter {
    variable: Variable,
    receiver: BoundsReceiver,
    domain: Option<BoundDomain>,
}

/// Reads the matches of a single triple pattern page by page.
///
/// The stream keeps track of the cost that remains until it should be read next. Reading the
/// stream resets this cost to the estimate the source published with the latest page. Between
/// two reads the cost only decreases through [PatternStream::spend].
#[derive(Debug)]
pub struct PatternStream {
    id: StreamId,
    pattern: TriplePattern,
    variables: Vec<Variable>,
    source: Arc<dyn FragmentSource>,
    /// The next page to read. [None] once the source is exhausted.
    next_page: Option<PageNumber>,
    remaining_cost: f64,
    /// All surfaced triples that have not been retracted, in the order they were surfaced.
    triples: Vec<Triple>,
    surfaced: FxHashSet<Triple>,
    filters: Vec<BoundFilter>,
    apply_bound_filters: bool,
    supplied: Vec<Variable>,
}

impl PatternStream {
    /// Creates a new [PatternStream] for `pattern`. The initial cost is the number of matches the
    /// source announced in `metadata`.
    pub fn new(
        id: StreamId,
        pattern: TriplePattern,
        metadata: FragmentMetadata,
        source: Arc<dyn FragmentSource>,
        apply_bound_filters: bool,
    ) -> Self {
        Self {
            id,
            variables: pattern_variables(&pattern),
            pattern,
            source,
            next_page: Some(1),
            remaining_cost: cost_estimate(metadata),
            triples: Vec::new(),
            surfaced: FxHashSet::default(),
            filters: Vec::new(),
            apply_bound_filters,
            supplied: Vec::new(),
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn pattern(&self) -> &TriplePattern {
        &self.pattern
    }

    /// Returns the variables of the pattern in the order of their first occurrence.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Returns all surfaced triples that have not been retracted.
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Returns whether the source of this stream is exhausted.
    pub fn ended(&self) -> bool {
        self.next_page.is_none()
    }

    /// Returns the cost that remains until the stream should be read next, or infinity once the
    /// stream has ended.
    pub fn cost(&self) -> f64 {
        if self.ended() {
            f64::INFINITY
        } else {
            self.remaining_cost
        }
    }

    /// Charges `amount` to this stream. The cost never drops below zero, which is the point at
    /// which the stream is due to be read.
    pub fn spend(&mut self, amount: f64) {
        if !self.ended() {
            self.remaining_cost = (self.remaining_cost - amount).max(0.0);
        }
    }

    /// Returns whether the stream has not ended and its whole cost has been charged.
    pub fn is_due(&self) -> bool {
        !self.ended() && self.remaining_cost <= 0.0
    }

    /// Returns the position at which `variable` first occurs in the pattern.
    pub fn variable_position(
        &self,
        variable: &Variable,
    ) -> Result<TriplePosition, InvalidVariableError> {
        variable_position(&self.pattern, variable)
    }

    /// Returns whether this stream is the authoritative producer of bindings for `variable`.
    pub fn supplies(&self, variable: &Variable) -> bool {
        self.supplied.contains(variable)
    }

    /// Projects `triple` onto `variable`. Returns [None] for malformed projections.
    pub fn project(&self, triple: &Triple, variable: &Variable) -> Option<Term> {
        project(&self.pattern, triple, variable)
    }

    /// Returns the distinct values that the surfaced triples bind to `variable`.
    pub fn domain(&self, variable: &Variable) -> Result<FxHashSet<Term>, InvalidVariableError> {
        self.variable_position(variable)?;
        Ok(self
            .triples
            .iter()
            .filter_map(|triple| self.project(triple, variable))
            .collect())
    }

    pub(crate) fn add_bound_filter(&mut self, variable: Variable, receiver: BoundsReceiver) {
        self.filters.push(BoundFilter {
            variable,
            receiver,
            domain: None,
        });
    }

    pub(crate) fn add_supplied(&mut self, variable: Variable) {
        self.supplied.push(variable);
    }

    /// Fetches the next page of the pattern.
    ///
    /// Before the new triples are surfaced, the stream applies all complete variable domains it
    /// received since the last read and retracts the surfaced triples that fall outside of them.
    /// Reading a stream that has already ended returns an empty delta.
    pub async fn read(&mut self) -> Result<StreamDelta, JoinError> {
        let Some(page_number) = self.next_page else {
            return Ok(StreamDelta::default());
        };

        let page = self
            .fetch(page_number)
            .await
            .map_err(|source| JoinError::Read {
                pattern: self.pattern.clone(),
                source,
            })?;

        let removed = self.refresh_bound_filters();
        self.next_page = page.next_page;
        self.remaining_cost = cost_estimate(page.metadata);

        let mut added = Vec::new();
        for triple in page.triples {
            if self.surfaced.contains(&triple)
                || !pattern_matches(&self.pattern, &triple)
                || !self.within_bounds(&triple)
            {
                continue;
            }
            self.surfaced.insert(triple.clone());
            self.triples.push(triple.clone());
            added.push(triple);
        }

        debug!(
            stream = %self.id,
            page = page_number,
            added = added.len(),
            removed = removed.len(),
            ended = self.ended(),
            "read page of pattern {}",
            self.pattern
        );
        Ok(StreamDelta { added, removed })
    }

    async fn fetch(&self, page: PageNumber) -> Result<FragmentPage, SourceError> {
        let mut fragment = self.source.fragment(&self.pattern, page).await?;
        let result = fragment.page().await;
        fragment.close();
        result
    }

    /// Picks up newly published domains and returns the triples that no longer satisfy them.
    fn refresh_bound_filters(&mut self) -> Vec<Triple> {
        if !self.apply_bound_filters {
            return Vec::new();
        }

        let mut changed = false;
        for filter in &mut self.filters {
            if filter.receiver.has_changed().unwrap_or(false) {
                filter.domain = filter.receiver.borrow_and_update().clone();
                changed = true;
                trace!(stream = %self.id, variable = %filter.variable, "received complete domain");
            }
        }
        if !changed {
            return Vec::new();
        }

        let (kept, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.triples)
            .into_iter()
            .partition(|triple| self.within_bounds(triple));
        for triple in &removed {
            self.surfaced.remove(triple);
        }
        self.triples = kept;
        removed
    }

    fn within_bounds(&self, triple: &Triple) -> bool {
        self.filters.iter().all(|filter| match &filter.domain {
            None => true,
            Some(domain) => self
                .project(triple, &filter.variable)
                .is_some_and(|term| domain.contains(&term)),
        })
    }
}

#[allow(
    clippy::cast_precision_loss,
    reason = "Cost estimates do not need to be exact"
)]
fn cost_estimate(metadata: FragmentMetadata) -> f64 {
    metadata.total_triples as f64
}
