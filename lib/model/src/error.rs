use crate::{TriplePattern, Variable};
use thiserror::Error;

/// A variable was used to look up a position of a triple pattern that does not mention it.
///
/// This always indicates a programming or setup error. It is surfaced to the caller and never
/// retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("The variable {variable} does not occur in the pattern {pattern}")]
pub struct InvalidVariableError {
    /// The variable that was looked up.
    pub variable: Variable,
    /// The pattern that was searched.
    pub pattern: TriplePattern,
}
