use tpf_join_common::error::{SinkError, SourceError};
use tpf_join_model::{InvalidVariableError, TriplePattern};

/// An error raised while setting up or running a join.
///
/// Exhausting all pattern streams is not an error. It is reported as
/// [RoundOutcome::Exhausted](crate::RoundOutcome::Exhausted).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum JoinError {
    /// A variable was used with a pattern that does not mention it.
    #[error(transparent)]
    InvalidVariable(#[from] InvalidVariableError),
    /// The source could not provide the metadata of a pattern during the setup.
    #[error("Failed to fetch the metadata of the pattern {pattern}")]
    MetadataFetch {
        /// The pattern whose metadata was requested.
        pattern: TriplePattern,
        /// The error of the source.
        #[source]
        source: SourceError,
    },
    /// The source could not provide the next page of a pattern.
    #[error("Failed to read the next page of the pattern {pattern}")]
    Read {
        /// The pattern that was read.
        pattern: TriplePattern,
        /// The error of the source.
        #[source]
        source: SourceError,
    },
    /// The result sink rejected the triples of a round.
    ///
    /// The round itself is complete. The scheduler keeps the rejected triples and hands them to
    /// the sink again in the next round.
    #[error(transparent)]
    Sink(#[from] SinkError),
}
