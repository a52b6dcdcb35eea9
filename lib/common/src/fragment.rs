use crate::error::SourceError;
use async_trait::async_trait;
use std::fmt::Debug;
use tpf_join_model::{Triple, TriplePattern};

/// The 1-based number of a page of a fragment.
pub type PageNumber = u64;

/// Metadata that a source publishes alongside each fragment page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FragmentMetadata {
    /// The estimated number of triples that match the pattern of the fragment.
    pub total_triples: u64,
}

/// A single page of a fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FragmentPage {
    /// The triples on this page.
    pub triples: Vec<Triple>,
    /// The metadata that was published with this page.
    pub metadata: FragmentMetadata,
    /// The page that follows this one. [None] if the fragment is exhausted.
    pub next_page: Option<PageNumber>,
}

/// A remote source that answers single triple patterns page by page.
///
/// Implementations are responsible for the transport. The join engine only asks for a fragment of
/// a pattern, reads its metadata or its page, and closes it again.
#[async_trait]
pub trait FragmentSource: Debug + Send + Sync {
    /// Opens the fragment holding page `page` of the matches of `pattern`.
    async fn fragment(
        &self,
        pattern: &TriplePattern,
        page: PageNumber,
    ) -> Result<Box<dyn Fragment>, SourceError>;
}

/// An opened page of the matches of a triple pattern.
#[async_trait]
pub trait Fragment: Send {
    /// Returns the metadata of the fragment.
    async fn metadata(&mut self) -> Result<FragmentMetadata, SourceError>;

    /// Returns the triples of this page together with the metadata and a link to the next page.
    async fn page(&mut self) -> Result<FragmentPage, SourceError>;

    /// Releases the fragment.
    fn close(self: Box<Self>) {}
}
