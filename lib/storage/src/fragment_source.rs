use crate::LoaderError;
use async_trait::async_trait;
use oxrdfio::{RdfFormat, RdfParser};
use rustc_hash::{FxHashMap, FxHashSet};
use std::io::Read;
use std::sync::Arc;
use tpf_join_common::error::SourceError;
use tpf_join_common::{Fragment, FragmentMetadata, FragmentPage, FragmentSource, PageNumber};
use tpf_join_model::{pattern_matches, Triple, TriplePattern};

/// A [FragmentSource] that answers triple patterns from triples held in memory.
///
/// The matches of a pattern are served in the order in which the triples were inserted, split
/// into pages of [MemoryFragmentSource::page_size] triples. Cloning the source is cheap.
#[derive(Clone, Debug)]
pub struct MemoryFragmentSource {
    triples: Arc<Vec<Triple>>,
    page_size: usize,
    count_overrides: Arc<FxHashMap<TriplePattern, u64>>,
}

impl MemoryFragmentSource {
    /// The page size used if no other page size is configured.
    pub const DEFAULT_PAGE_SIZE: usize = 100;

    /// Creates a new [MemoryFragmentSource] holding `triples`. Duplicates are dropped.
    pub fn new(triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut seen = FxHashSet::default();
        let triples = triples
            .into_iter()
            .filter(|triple| seen.insert(triple.clone()))
            .collect();
        Self {
            triples: Arc::new(triples),
            page_size: Self::DEFAULT_PAGE_SIZE,
            count_overrides: Arc::new(FxHashMap::default()),
        }
    }

    /// Parses `reader` in the given `format` and creates a source holding all of its triples.
    ///
    /// Triples from all graphs of a dataset format are merged.
    pub fn load(reader: impl Read, format: RdfFormat) -> Result<Self, LoaderError> {
        let triples = RdfParser::from_format(format)
            .for_reader(reader)
            .map(|quad| quad.map(|q| Triple::new(q.subject, q.predicate, q.object)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(triples))
    }

    /// Sets the number of triples per page. A page size of zero is treated as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Publishes `total_triples` as the count estimate of `pattern` instead of the exact count.
    #[must_use]
    pub fn with_count_estimate(mut self, pattern: TriplePattern, total_triples: u64) -> Self {
        Arc::make_mut(&mut self.count_overrides).insert(pattern, total_triples);
        self
    }

    /// Returns the number of triples per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of triples in the source.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Returns whether the source holds no triples.
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    fn matches(&self, pattern: &TriplePattern) -> Vec<&Triple> {
        self.triples
            .iter()
            .filter(|triple| pattern_matches(pattern, triple))
            .collect()
    }
}

#[async_trait]
impl FragmentSource for MemoryFragmentSource {
    async fn fragment(
        &self,
        pattern: &TriplePattern,
        page: PageNumber,
    ) -> Result<Box<dyn Fragment>, SourceError> {
        let index = page
            .checked_sub(1)
            .and_then(|index| usize::try_from(index).ok())
            .ok_or_else(|| SourceError::Other(format!("Invalid page number {page}").into()))?;

        let matches = self.matches(pattern);
        let total_triples = self
            .count_overrides
            .get(pattern)
            .copied()
            .unwrap_or_else(|| u64::try_from(matches.len()).unwrap_or(u64::MAX));

        let start = index.saturating_mul(self.page_size).min(matches.len());
        let end = start.saturating_add(self.page_size).min(matches.len());
        let next_page = (end < matches.len()).then(|| page + 1);

        Ok(Box::new(MemoryFragment {
            triples: matches[start..end].iter().copied().cloned().collect(),
            metadata: FragmentMetadata { total_triples },
            next_page,
        }))
    }
}

/// A page of a [MemoryFragmentSource].
#[derive(Debug)]
pub struct MemoryFragment {
    triples: Vec<Triple>,
    metadata: FragmentMetadata,
    next_page: Option<PageNumber>,
}

#[async_trait]
impl Fragment for MemoryFragment {
    async fn metadata(&mut self) -> Result<FragmentMetadata, SourceError> {
        Ok(self.metadata)
    }

    async fn page(&mut self) -> Result<FragmentPage, SourceError> {
        Ok(FragmentPage {
            triples: std::mem::take(&mut self.triples),
            metadata: self.metadata,
            next_page: self.next_page,
        })
    }
}
