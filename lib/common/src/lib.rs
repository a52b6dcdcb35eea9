pub mod error;
mod fragment;
mod result_sink;

pub use fragment::{Fragment, FragmentMetadata, FragmentPage, FragmentSource, PageNumber};
pub use result_sink::ResultSink;
