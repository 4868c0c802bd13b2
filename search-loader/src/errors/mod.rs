//! Error types for the search loader pipeline.

use search_loader_repository::SearchIndexError;
use search_loader_source::SourceError;
use thiserror::Error;

/// Reasons a single source document is skipped by the transformer.
///
/// These never stop the run; the loader counts them as skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// The document has no usable `_id`.
    #[error("Document has no usable key: {0}")]
    MissingKey(String),

    /// A field the schema marks as required has no value.
    #[error("Missing required field {0}")]
    MissingField(String),

    /// A value could not be converted to the declared field type.
    #[error("Invalid value for field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

impl TransformError {
    pub fn missing_key(msg: impl Into<String>) -> Self {
        Self::MissingKey(msg.into())
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from building the loader or transformer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoaderError {
    /// Invalid loader configuration.
    #[error("Invalid loader configuration: {0}")]
    InvalidConfig(String),

    /// A field mapping does not fit the schema.
    #[error("Invalid field mapping: {0}")]
    InvalidMapping(String),
}

impl LoaderError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn invalid_mapping(msg: impl Into<String>) -> Self {
        Self::InvalidMapping(msg.into())
    }
}

/// Fatal errors that move the pipeline to `Failed`.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The document store could not be reached.
    #[error("Source connection error: {0}")]
    Connection(String),

    /// The document store rejected the read, or the cursor failed mid-stream.
    #[error("Source query error: {0}")]
    Query(String),

    /// The index could not be created with the requested schema.
    #[error("Schema validation error: {0}")]
    SchemaValidation(String),

    /// Any other search service failure during index setup.
    #[error("Search service error: {0}")]
    Service(String),
}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Connection(msg) => Self::Connection(msg),
            SourceError::Query(msg) | SourceError::Serialization(msg) => Self::Query(msg),
        }
    }
}

impl From<SearchIndexError> for PipelineError {
    fn from(err: SearchIndexError) -> Self {
        match err {
            SearchIndexError::SchemaValidation { .. } | SearchIndexError::ValidationError(_) => {
                Self::SchemaValidation(err.to_string())
            }
            other => Self::Service(other.to_string()),
        }
    }
}
