use oxrdfio::RdfParseError;

/// An error raised while loading a file into a
/// [`MemoryFragmentSource`](crate::MemoryFragmentSource).
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// An error raised while reading the file.
    #[error(transparent)]
    Parsing(#[from] RdfParseError),
}
