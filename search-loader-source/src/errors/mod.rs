//! Error types for the document source.

mod source_error;

pub use source_error::SourceError;
