//! Search index service implementation.
//!
//! This module provides the main service for interacting with the search index.
//! Application code uses this to (re)create the index from a schema and to push
//! batches of documents.
//!
//! # Note on Document Creation
//!
//! There is no separate `create` or `update` function. `push_batch` performs an
//! upsert: a document is created if its key is new and replaced otherwise.

use search_loader_shared::{IndexDocument, IndexSchema, SchemaMismatch};
use tracing::{info, warn};

use crate::config::SearchIndexServiceConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::BatchOperationSummary;

/// The main service for interacting with the search index.
///
/// This is the high-level API that application code should use. It provides schema
/// and batch validation and delegates to a `SearchIndexProvider` for actual backend
/// operations. All operations return `SearchIndexError` for consistent error handling.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use search_loader_repository::SearchIndexService;
/// use search_loader_repository::opensearch::{IndexConfig, OpenSearchProvider};
/// use search_loader_shared::{FieldDef, FieldType, IndexDocument, IndexSchema};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = OpenSearchProvider::new(
///     "http://localhost:9200",
///     IndexConfig::default(),
///     Duration::from_secs(30),
/// )
/// .await?;
/// let service = SearchIndexService::new(Box::new(provider));
///
/// let schema = IndexSchema::new(
///     "synthetic-index",
///     vec![FieldDef::key("id"), FieldDef::new("cat", FieldType::String).searchable()],
/// );
/// service.ensure_index(&schema).await?;
///
/// let batch = vec![IndexDocument::new("1").with_field("cat", "Chess")];
/// service.push_batch(&schema.name, "id", &batch).await?;
/// # Ok(())
/// # }
/// ```
pub struct SearchIndexService {
    provider: Box<dyn SearchIndexProvider>,
    config: SearchIndexServiceConfig,
}

impl SearchIndexService {
    /// Create a new SearchIndexService with default configuration.
    ///
    /// The default configuration includes a batch size limit of 1000 documents.
    pub fn new(provider: Box<dyn SearchIndexProvider>) -> Self {
        Self {
            provider,
            config: SearchIndexServiceConfig::default(),
        }
    }

    /// Create a new SearchIndexService with custom configuration.
    pub fn with_config(
        provider: Box<dyn SearchIndexProvider>,
        config: SearchIndexServiceConfig,
    ) -> Self {
        Self { provider, config }
    }

    /// The configured batch size limit, if any.
    pub fn max_batch_size(&self) -> Option<usize> {
        self.config.max_batch_size
    }

    /// Check if batch size exceeds the configured limit.
    fn validate_batch_size(&self, size: usize) -> Result<(), SearchIndexError> {
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(SearchIndexError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    /// Recreate the index from `schema` and verify the result.
    ///
    /// The index is a derived artifact: if it already exists it is deleted together
    /// with its documents, then created from `schema`. The schema reported by the
    /// backend afterwards must have exactly the requested field names, field types
    /// and key field.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index exists and matches `schema`
    /// * `Err(SearchIndexError::ValidationError)` - If `schema` itself is invalid
    /// * `Err(SearchIndexError::SchemaValidation)` - If the created index differs from `schema`
    /// * `Err(SearchIndexError)` - If any backend call fails
    pub async fn ensure_index(&self, schema: &IndexSchema) -> Result<(), SearchIndexError> {
        let key = schema.validate()?;

        match self.provider.get_index_schema(&schema.name).await? {
            Some(existing) => {
                info!(
                    index = %schema.name,
                    existing_fields = existing.fields.len(),
                    "Index exists, deleting before recreation"
                );
                self.provider.delete_index(&schema.name).await?;
            }
            None => info!(index = %schema.name, "Index does not exist"),
        }

        self.provider.create_index(schema).await?;

        let remote = self
            .provider
            .get_index_schema(&schema.name)
            .await?
            .ok_or_else(|| {
                SearchIndexError::schema_validation(
                    &schema.name,
                    schema
                        .fields
                        .iter()
                        .map(|f| SchemaMismatch::MissingField(f.name.clone()))
                        .collect(),
                )
            })?;

        let mismatches = schema.mismatches(&remote);
        if !mismatches.is_empty() {
            warn!(
                index = %schema.name,
                mismatches = mismatches.len(),
                "Created index does not match the requested schema"
            );
            return Err(SearchIndexError::schema_validation(&schema.name, mismatches));
        }

        info!(
            index = %schema.name,
            key_field = %key.name,
            fields = schema.fields.len(),
            "Index ready"
        );
        Ok(())
    }

    /// Upsert one batch of documents in a single backend call.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-document results; partial failures are reported here
    /// * `Err(SearchIndexError::BatchSizeExceeded)` - If the batch exceeds the configured maximum
    /// * `Err(SearchIndexError::ValidationError)` - If a document has an empty key
    /// * `Err(SearchIndexError)` - If the push failed as a whole
    pub async fn push_batch(
        &self,
        index: &str,
        key_field: &str,
        documents: &[IndexDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if documents.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        self.validate_batch_size(documents.len())?;

        if let Some(position) = documents.iter().position(|d| d.key.is_empty()) {
            return Err(SearchIndexError::validation(format!(
                "Document at position {} has an empty key",
                position
            )));
        }

        self.provider.bulk_upsert(index, key_field, documents).await
    }

    /// Check that the backend is reachable.
    pub async fn health_check(&self) -> Result<(), SearchIndexError> {
        self.provider.health_check().await
    }
}
