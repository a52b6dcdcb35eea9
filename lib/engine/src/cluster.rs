use crate::stream::StreamId;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tpf_join_model::{Term, Variable};
use tracing::trace;

/// The complete set of values a variable can take.
pub type BoundDomain = Arc<FxHashSet<Term>>;

pub(crate) type BoundsReceiver = watch::Receiver<Option<BoundDomain>>;

/// What a [VariableCluster] settled at the end of a round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// The variable of the cluster.
    pub variable: Variable,
    /// Whether the bindings or the bounds of the cluster changed since the last settlement.
    pub changed: bool,
    /// Whether the complete domain of the variable was published to the member streams.
    pub published_bounds: bool,
    /// The number of bindings after the settlement.
    pub bindings: usize,
}

/// Aggregates the bindings of a single join variable across all streams that mention it.
///
/// Bindings are reconciled incrementally: removals and additions reported by the member streams
/// are applied to the binding set as they arrive, and [VariableCluster::update] settles them at
/// the end of a round. Once a member stream is exhausted, the values it bound to the variable are
/// recorded as the complete domain of the variable. The domain is recorded at most once and
/// published to all member streams when the cluster is settled.
#[derive(Debug)]
pub struct VariableCluster {
    variable: Variable,
    members: Vec<StreamId>,
    bindings: FxHashSet<Term>,
    bounds: Option<BoundDomain>,
    publisher: watch::Sender<Option<BoundDomain>>,
    bounds_published: bool,
    dirty: bool,
}

impl VariableCluster {
    /// Creates a new [VariableCluster] without members.
    pub fn new(variable: Variable) -> Self {
        let (publisher, _) = watch::channel(None);
        Self {
            variable,
            members: Vec::new(),
            bindings: FxHashSet::default(),
            bounds: None,
            publisher,
            bounds_published: false,
            dirty: false,
        }
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    /// Returns the streams that mention the variable, in ascending order.
    pub fn members(&self) -> &[StreamId] {
        &self.members
    }

    /// Returns the values currently known to satisfy joins on the variable.
    pub fn bindings(&self) -> &FxHashSet<Term> {
        &self.bindings
    }

    /// Returns the complete domain of the variable, if it is known.
    pub fn bounds(&self) -> Option<&BoundDomain> {
        self.bounds.as_ref()
    }

    /// Returns a receiver that observes the complete domain of the variable once it is published.
    pub fn subscribe(&self) -> watch::Receiver<Option<BoundDomain>> {
        self.publisher.subscribe()
    }

    pub(crate) fn add_member(&mut self, stream: StreamId) {
        if !self.members.contains(&stream) {
            self.members.push(stream);
            self.members.sort_unstable();
        }
    }

    /// Adds `values` to the bindings. Returns the number of values that were not bound before.
    pub fn add_bindings(&mut self, values: impl IntoIterator<Item = Term>) -> usize {
        let before = self.bindings.len();
        self.bindings.extend(values);
        let added = self.bindings.len() - before;
        self.dirty |= added > 0;
        added
    }

    /// Removes `values` from the bindings. Values that are not bound are ignored. Returns the number
    /// of values that were removed.
    ///
    /// Bindings are a plain set without support counts. A removed value is gone even if another
    /// surfaced triple still binds it.
    pub fn remove_bindings(&mut self, values: impl IntoIterator<Item = Term>) -> usize {
        let removed = values
            .into_iter()
            .filter(|value| self.bindings.remove(value))
            .count();
        self.dirty |= removed > 0;
        removed
    }

    /// Records `values` as the complete domain of the variable.
    ///
    /// Must only be called once the stream that produced `values` has ended. The first recorded
    /// domain is kept for the rest of the run, so later calls have no effect and return `false`.
    pub fn add_bounds(&mut self, values: impl IntoIterator<Item = Term>) -> bool {
        if self.bounds.is_some() {
            trace!(variable = %self.variable, "ignoring additional complete domain");
            return false;
        }
        self.bounds = Some(Arc::new(values.into_iter().collect()));
        self.dirty = true;
        true
    }

    /// Settles the reconciliation of the current round.
    ///
    /// A newly recorded domain is published to the member streams, which apply it as a filter on
    /// their next read. Calling this method again without any change in between is a no-op.
    pub fn update(&mut self) -> Settlement {
        let mut published_bounds = false;
        if let (Some(bounds), false) = (&self.bounds, self.bounds_published) {
            self.publisher.send_replace(Some(Arc::clone(bounds)));
            self.bounds_published = true;
            published_bounds = true;
        }

        let settlement = Settlement {
            variable: self.variable.clone(),
            changed: self.dirty,
            published_bounds,
            bindings: self.bindings.len(),
        };
        self.dirty = false;

        trace!(
            variable = %self.variable,
            changed = settlement.changed,
            published_bounds,
            bindings = settlement.bindings,
            "settled cluster"
        );
        settlement
    }
}
