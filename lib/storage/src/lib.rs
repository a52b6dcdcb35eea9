//! Contains in-memory implementations of the collaborators of the join engine.
//!
//! The [MemoryFragmentSource] serves triple pattern fragments page by page from a set of triples
//! held in memory, and the [MemoryResultStore] collects the triples accepted by the engine.

mod error;
mod fragment_source;
mod result_store;

pub use error::LoaderError;
pub use fragment_source::{MemoryFragment, MemoryFragmentSource};
pub use result_store::MemoryResultStore;
