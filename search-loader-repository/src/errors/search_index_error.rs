//! Search index error types.
//!
//! This module defines the unified error type for all search index operations,
//! including both low-level backend errors and high-level application errors.

use search_loader_shared::{SchemaError, SchemaMismatch};
use thiserror::Error;

/// Unified errors from search index operations.
///
/// Used by the `SearchIndexProvider` trait and `SearchIndexService` for all search index
/// operations. Includes both low-level backend errors (connection, serialization, etc.)
/// and high-level application errors (validation, schema mismatch, etc.).
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., an invalid local schema or an empty key).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to establish connection to the search index backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to create the search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to delete the search index.
    #[error("Index deletion error: {0}")]
    IndexDeletionError(String),

    /// The index reported by the service does not match the requested schema.
    #[error("Schema validation failed for index {index}: {}", format_mismatches(.mismatches))]
    SchemaValidation {
        index: String,
        mismatches: Vec<SchemaMismatch>,
    },

    /// Bulk indexing operation was rejected as a whole.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to parse response from search index backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search index backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The service asked the client to slow down (HTTP 429 / 503).
    #[error("Throttled by search service: {0}")]
    Throttled(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

fn format_mismatches(mismatches: &[SchemaMismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create an index deletion error.
    pub fn index_deletion(msg: impl Into<String>) -> Self {
        Self::IndexDeletionError(msg.into())
    }

    /// Create a schema validation error.
    pub fn schema_validation(index: impl Into<String>, mismatches: Vec<SchemaMismatch>) -> Self {
        Self::SchemaValidation {
            index: index.into(),
            mismatches,
        }
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a throttling error.
    pub fn throttled(msg: impl Into<String>) -> Self {
        Self::Throttled(msg.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Only transport failures and throttling qualify; everything else is a
    /// deterministic rejection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionError(_) | Self::Throttled(_))
    }
}

impl From<SchemaError> for SearchIndexError {
    fn from(err: SchemaError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for SearchIndexError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(SearchIndexError::connection("reset").is_retryable());
        assert!(SearchIndexError::throttled("429").is_retryable());
        assert!(!SearchIndexError::bulk_index("400").is_retryable());
        assert!(!SearchIndexError::batch_size_exceeded(2, 1).is_retryable());
    }

    #[test]
    fn test_schema_validation_message_lists_mismatches() {
        let err = SearchIndexError::schema_validation(
            "synthetic-index",
            vec![
                SchemaMismatch::MissingField("cat".to_string()),
                SchemaMismatch::UnexpectedField("extra".to_string()),
            ],
        );

        let message = err.to_string();
        assert!(message.contains("synthetic-index"));
        assert!(message.contains("field cat missing from index"));
        assert!(message.contains("unexpected field extra in index"));
    }
}
