mod error;
mod pattern;

pub use error::*;
pub use pattern::*;

// Re-export some oxrdf types.
pub use oxrdf::vocab;
pub use oxrdf::{
    BlankNode, BlankNodeRef, Literal, LiteralRef, NamedNode, NamedNodeRef, Subject, SubjectRef,
    Term, TermRef, Triple, TripleRef, Variable, VariableRef,
};

// Re-export the spargebra types used to describe and parse patterns.
pub use spargebra::algebra::GraphPattern;
pub use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};
pub use spargebra::{Query, SparqlSyntaxError};
