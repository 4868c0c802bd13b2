//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Azure AI Search, etc.).

use async_trait::async_trait;
use search_loader_shared::{IndexDocument, IndexSchema};

use crate::errors::SearchIndexError;
use crate::types::BatchOperationSummary;

/// Abstracts the underlying search index implementation (OpenSearch, Azure AI Search, etc.).
///
/// This trait defines the interface for all search index backend implementations. Implementations
/// are injected into `SearchIndexService` to enable dependency injection and easy testing with
/// mock implementations.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations.
///
/// # Note on Document Creation
///
/// There is no separate create or update operation. `bulk_upsert` writes every document under
/// its key: a new key creates the document, an existing key replaces it. Pushing the same batch
/// twice leaves the index unchanged.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Fetch the schema of an existing index.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(IndexSchema))` - The schema as reported by the backend
    /// * `Ok(None)` - If the index does not exist
    /// * `Err(SearchIndexError)` - If the backend cannot be queried
    async fn get_index_schema(&self, name: &str) -> Result<Option<IndexSchema>, SearchIndexError>;

    /// Create an index from a schema. The index must not exist yet.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was created
    /// * `Err(SearchIndexError::IndexCreationError)` - If the backend rejects the schema
    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchIndexError>;

    /// Delete an index and all its documents.
    ///
    /// Deleting an index that does not exist is considered successful.
    async fn delete_index(&self, name: &str) -> Result<(), SearchIndexError>;

    /// Upsert a batch of documents in a single backend call.
    ///
    /// Each document is written with its key under `key_field`.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-document outcome of the request
    /// * `Err(SearchIndexError)` - If the request failed as a whole
    async fn bulk_upsert(
        &self,
        index: &str,
        key_field: &str,
        documents: &[IndexDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Check that the backend is reachable and accepts our credentials.
    async fn health_check(&self) -> Result<(), SearchIndexError>;
}
