//! Document store trait definitions.

use async_trait::async_trait;
use bson::Document;
use futures::stream::BoxStream;

use crate::errors::SourceError;

/// A finite, single-pass stream of source documents.
///
/// The stream is backed by a server-side cursor and cannot be restarted. The
/// cursor is released when the stream is exhausted, yields an error, or is
/// dropped.
pub type DocumentStream = BoxStream<'static, Result<Document, SourceError>>;

/// Read side of the document store.
///
/// Implementations are injected into the orchestrator so that the pipeline can
/// run against MongoDB or against in-memory fixtures.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Number of documents matching `filter` (all documents when `None`).
    async fn count(&self, filter: Option<Document>) -> Result<u64, SourceError>;

    /// Open a stream over the documents matching `filter`, at most `limit` of them.
    ///
    /// # Returns
    ///
    /// * `Ok(DocumentStream)` - The cursor was opened; read errors surface as stream items
    /// * `Err(SourceError::Query)` - If the store rejected the filter
    /// * `Err(SourceError::Connection)` - If the store cannot be reached
    async fn fetch(
        &self,
        filter: Option<Document>,
        limit: Option<i64>,
    ) -> Result<DocumentStream, SourceError>;

    /// Release the underlying client. Calling it more than once is a no-op.
    async fn close(&self) -> Result<(), SourceError>;
}

/// Write side of the document store.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Insert all documents in one bulk call and return how many were inserted.
    async fn insert_many(&self, documents: Vec<Document>) -> Result<usize, SourceError>;

    /// Release the underlying client. Calling it more than once is a no-op.
    async fn close(&self) -> Result<(), SourceError>;
}
