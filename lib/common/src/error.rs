use std::error::Error;
use std::io;

/// An error raised by a [FragmentSource](crate::FragmentSource) or one of its fragments.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SourceError {
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The source cannot answer the request right now.
    #[error("The fragment source is unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl SourceError {
    /// Builds an error from a printable error message.
    #[inline]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// An error raised by a [ResultSink](crate::ResultSink) while incorporating triples.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SinkError {
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
}
