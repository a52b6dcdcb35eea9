//! Executes joins over triple patterns whose matches can only be fetched page by page from
//! separate sources.
//!
//! The [JoinScheduler] owns one [PatternStream] per pattern and one [VariableCluster] per join
//! variable. In every round it reads the stream that is cheapest to advance, charges all other
//! streams the same cost, and reconciles the bindings the read produced or retracted into the
//! clusters of the stream's variables. Once a stream is exhausted, the values it bound to a
//! variable form the complete domain of that variable, and the cluster publishes this domain to
//! all other member streams, which use it to filter what they surface.

mod cluster;
pub mod error;
mod options;
mod scheduler;
mod stream;

pub use cluster::{BoundDomain, Settlement, VariableCluster};
pub use options::JoinOptions;
pub use scheduler::{JoinScheduler, RoundOutcome, RoundReport, RunSummary, StreamRead};
pub use stream::{PatternStream, StreamDelta, StreamId};
