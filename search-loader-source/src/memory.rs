//! In-memory document store.
//!
//! Backs tests and offline runs with the same traits as the MongoDB store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use futures::{stream, StreamExt};
use tokio::sync::Mutex;

use crate::errors::SourceError;
use crate::interfaces::{DocumentSink, DocumentSource, DocumentStream};

/// `DocumentSource` and `DocumentSink` over a `Vec<Document>`.
///
/// Filters match on top-level field equality. Cloning shares the same
/// documents, which lets a test keep a handle after passing the store on.
#[derive(Clone, Default)]
pub struct InMemorySource {
    documents: Arc<Mutex<Vec<Document>>>,
    fail_after: Option<(usize, SourceError)>,
    close_calls: Arc<AtomicUsize>,
}

impl InMemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: Arc::new(Mutex::new(documents)),
            ..Default::default()
        }
    }

    /// Yield `error` as the stream item following the first `count` documents.
    pub fn with_read_error_after(mut self, count: usize, error: SourceError) -> Self {
        self.fail_after = Some((count, error));
        self
    }

    /// Snapshot of the stored documents.
    pub async fn documents(&self) -> Vec<Document> {
        self.documents.lock().await.clone()
    }

    /// How many times `close` was called through either trait.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn matches(document: &Document, filter: &Document) -> bool {
        filter
            .iter()
            .all(|(key, value)| document.get(key) == Some(value))
    }

    async fn matching(&self, filter: Option<&Document>) -> Vec<Document> {
        let documents = self.documents.lock().await;
        match filter {
            Some(filter) => documents
                .iter()
                .filter(|d| Self::matches(d, filter))
                .cloned()
                .collect(),
            None => documents.clone(),
        }
    }
}

#[async_trait]
impl DocumentSource for InMemorySource {
    async fn count(&self, filter: Option<Document>) -> Result<u64, SourceError> {
        Ok(self.matching(filter.as_ref()).await.len() as u64)
    }

    async fn fetch(
        &self,
        filter: Option<Document>,
        limit: Option<i64>,
    ) -> Result<DocumentStream, SourceError> {
        let mut documents = self.matching(filter.as_ref()).await;
        // Same semantics as the MongoDB driver: zero means no limit
        if let Some(limit) = limit.filter(|l| *l != 0) {
            documents.truncate(limit.unsigned_abs() as usize);
        }

        let mut items: Vec<Result<Document, SourceError>> =
            documents.into_iter().map(Ok).collect();
        if let Some((count, ref error)) = self.fail_after {
            items.truncate(count);
            items.push(Err(error.clone()));
        }

        Ok(stream::iter(items).boxed())
    }

    async fn close(&self) -> Result<(), SourceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl DocumentSink for InMemorySource {
    async fn insert_many(&self, documents: Vec<Document>) -> Result<usize, SourceError> {
        let mut stored = self.documents.lock().await;
        let inserted = documents.len();
        for mut document in documents {
            if !document.contains_key("_id") {
                document.insert("_id", ObjectId::new());
            }
            stored.push(document);
        }
        Ok(inserted)
    }

    async fn close(&self) -> Result<(), SourceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
