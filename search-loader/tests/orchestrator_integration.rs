//! Integration tests for the search loader orchestrator.
//!
//! These tests use the real Orchestrator, transformer and loader with an
//! in-memory document source and a mock search provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use serde_json::Value;

use search_loader::errors::PipelineError;
use search_loader::loader::LoaderConfig;
use search_loader::orchestrator::{Orchestrator, PipelineState};
use search_loader::transformer::{default_mappings, default_schema, DocumentTransformer};
use search_loader_repository::{
    BatchOperationResult, BatchOperationSummary, SearchIndexError, SearchIndexProvider,
    SearchIndexService,
};
use search_loader_shared::{IndexDocument, IndexSchema};
use search_loader_source::{DocumentSource, DocumentStream, InMemorySource, SourceError};

const INDEX: &str = "synthetic-index";

#[derive(Default)]
struct MockState {
    /// Index name -> (schema, key -> stored document).
    indexes: HashMap<String, (IndexSchema, HashMap<String, Value>)>,
    /// Keys of every bulk call, in call order.
    pushes: Vec<Vec<String>>,
    deleted: Vec<String>,
}

/// Search provider that keeps indexes in memory and records calls.
/// Clones share their state.
#[derive(Clone, Default)]
struct MockSearchProvider {
    state: Arc<Mutex<MockState>>,
    /// Field left out of every created index.
    drop_field: Option<String>,
    fail_create: bool,
    reject_keys: Vec<String>,
}

impl MockSearchProvider {
    fn pushes(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().pushes.clone()
    }

    fn stored(&self, index: &str) -> HashMap<String, Value> {
        self.state
            .lock()
            .unwrap()
            .indexes
            .get(index)
            .map(|(_, docs)| docs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchIndexProvider for MockSearchProvider {
    async fn get_index_schema(&self, name: &str) -> Result<Option<IndexSchema>, SearchIndexError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .indexes
            .get(name)
            .map(|(schema, _)| schema.clone()))
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchIndexError> {
        if self.fail_create {
            return Err(SearchIndexError::index_creation("quota exceeded"));
        }
        let mut created = schema.clone();
        if let Some(ref dropped) = self.drop_field {
            created.fields.retain(|f| &f.name != dropped);
        }
        self.state
            .lock()
            .unwrap()
            .indexes
            .insert(schema.name.clone(), (created, HashMap::new()));
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), SearchIndexError> {
        let mut state = self.state.lock().unwrap();
        state.indexes.remove(name);
        state.deleted.push(name.to_string());
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        key_field: &str,
        documents: &[IndexDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut state = self.state.lock().unwrap();
        state
            .pushes
            .push(documents.iter().map(|d| d.key.clone()).collect());

        let (_, stored) = state
            .indexes
            .get_mut(index)
            .ok_or_else(|| SearchIndexError::bulk_index(format!("no such index {}", index)))?;

        let mut results = Vec::with_capacity(documents.len());
        for document in documents {
            if self.reject_keys.contains(&document.key) {
                results.push(BatchOperationResult::failed(
                    document.key.clone(),
                    SearchIndexError::bulk_index("document too large"),
                ));
            } else {
                stored.insert(document.key.clone(), document.to_json(key_field));
                results.push(BatchOperationResult::succeeded(document.key.clone()));
            }
        }
        Ok(BatchOperationSummary::from_results(results))
    }

    async fn health_check(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }
}

/// Source that cannot be reached.
#[derive(Clone, Default)]
struct UnreachableSource {
    close_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl DocumentSource for UnreachableSource {
    async fn count(&self, _filter: Option<Document>) -> Result<u64, SourceError> {
        Err(SourceError::connection("server selection timed out"))
    }

    async fn fetch(
        &self,
        _filter: Option<Document>,
        _limit: Option<i64>,
    ) -> Result<DocumentStream, SourceError> {
        Err(SourceError::connection("server selection timed out"))
    }

    async fn close(&self) -> Result<(), SourceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Source whose count is stale and always reports an empty collection.
#[derive(Clone)]
struct StaleCountSource(InMemorySource);

#[async_trait]
impl DocumentSource for StaleCountSource {
    async fn count(&self, _filter: Option<Document>) -> Result<u64, SourceError> {
        Ok(0)
    }

    async fn fetch(
        &self,
        filter: Option<Document>,
        limit: Option<i64>,
    ) -> Result<DocumentStream, SourceError> {
        self.0.fetch(filter, limit).await
    }

    async fn close(&self) -> Result<(), SourceError> {
        self.0.close().await
    }
}

fn day(id: impl Into<Bson>, cat: &str, weights: &[i32]) -> Document {
    let events: Vec<Bson> = weights
        .iter()
        .enumerate()
        .map(|(i, w)| {
            Bson::Document(doc! {
                "timestamp_event": bson::DateTime::from_millis(1_700_000_000_000 + i as i64 * 1000),
                "weight": *w,
            })
        })
        .collect();

    doc! {
        "_id": id.into(),
        "timestamp_day": bson::DateTime::from_millis(1_700_000_000_000),
        "cat": cat,
        "owner": { "email": "ken.thompson@example.net", "firstName": "Ken", "lastName": "Thompson" },
        "events": events,
    }
}

fn days(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| day(format!("day-{:03}", i), "Chess", &[14, 15]))
        .collect()
}

fn orchestrator(
    source: impl DocumentSource + 'static,
    provider: &MockSearchProvider,
    batch_size: usize,
) -> Orchestrator {
    let schema = default_schema(INDEX);
    let transformer = DocumentTransformer::new(&schema, default_mappings()).unwrap();
    let service = Arc::new(SearchIndexService::new(Box::new(provider.clone())));

    Orchestrator::new(
        Box::new(source),
        service,
        schema,
        transformer,
        LoaderConfig {
            batch_size,
            ..Default::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_document_without_id_is_skipped() {
    let source = InMemorySource::new(vec![
        day("a", "Golf", &[14]),
        doc! { "cat": "Golf", "events": [] },
        day("b", "Rowing", &[16]),
    ]);
    let provider = MockSearchProvider::default();
    let mut orchestrator = orchestrator(source.clone(), &provider, 2);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(provider.pushes(), vec![vec!["a".to_string(), "b".to_string()]]);
    assert_eq!(summary.read, 3);
    assert_eq!(summary.pushed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.batches, 1);
    assert_eq!(orchestrator.state(), PipelineState::Done);
    assert_eq!(source.close_calls(), 1);
}

#[tokio::test]
async fn test_batch_count_is_rounded_up() {
    for (n, batch_size, expected) in [
        (10, 3, vec![3, 3, 3, 1]),
        (9, 3, vec![3, 3, 3]),
        (2, 5, vec![2]),
    ] {
        let provider = MockSearchProvider::default();
        let mut orchestrator = orchestrator(InMemorySource::new(days(n)), &provider, batch_size);

        let summary = orchestrator.run().await.unwrap();

        let sizes: Vec<usize> = provider.pushes().iter().map(Vec::len).collect();
        assert_eq!(sizes, expected, "n = {}, batch size = {}", n, batch_size);
        assert_eq!(summary.pushed, n);
        assert_eq!(summary.batches, expected.len());
    }
}

#[tokio::test]
async fn test_documents_are_flattened() {
    let provider = MockSearchProvider::default();
    let mut orchestrator =
        orchestrator(InMemorySource::new(vec![day("x", "Golf", &[14, 16])]), &provider, 10);

    orchestrator.run().await.unwrap();

    let stored = provider.stored(INDEX);
    assert_eq!(
        stored["x"],
        serde_json::json!({
            "id": "x",
            "timestamp_day": "2023-11-14T22:13:20.000Z",
            "cat": "Golf",
            "owner_email": "ken.thompson@example.net",
            "owner_firstName": "Ken",
            "owner_lastName": "Thompson",
            "events_count": 2,
            "avg_weight": 15.0,
        })
    );
}

#[tokio::test]
async fn test_empty_source_completes() {
    let source = InMemorySource::default();
    let provider = MockSearchProvider::default();
    let mut orchestrator = orchestrator(source.clone(), &provider, 10);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.read, 0);
    assert_eq!(summary.pushed, 0);
    assert!(provider.pushes().is_empty());
    assert_eq!(orchestrator.state(), PipelineState::Done);
    assert_eq!(source.close_calls(), 1);
    assert!(provider.get_index_schema(INDEX).await.unwrap().is_some());
}

#[tokio::test]
async fn test_documents_are_read_when_count_is_zero() {
    let source = InMemorySource::new(days(3));
    let provider = MockSearchProvider::default();
    let mut orchestrator = orchestrator(StaleCountSource(source.clone()), &provider, 2);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.read, 3);
    assert_eq!(summary.pushed, 3);
    assert_eq!(summary.batches, 2);
    assert_eq!(orchestrator.state(), PipelineState::Done);
    assert_eq!(source.close_calls(), 1);
}

#[tokio::test]
async fn test_schema_mismatch_fails_before_reading() {
    let source = InMemorySource::new(days(3));
    let provider = MockSearchProvider {
        drop_field: Some("avg_weight".to_string()),
        ..Default::default()
    };
    let mut orchestrator = orchestrator(source.clone(), &provider, 10);

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::SchemaValidation(ref msg) if msg.contains("avg_weight")));
    assert_eq!(orchestrator.state(), PipelineState::Failed);
    assert!(provider.pushes().is_empty());
    assert_eq!(source.close_calls(), 1);
}

#[tokio::test]
async fn test_index_creation_failure() {
    let source = InMemorySource::new(days(3));
    let provider = MockSearchProvider {
        fail_create: true,
        ..Default::default()
    };
    let mut orchestrator = orchestrator(source.clone(), &provider, 10);

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::Service(_)));
    assert_eq!(orchestrator.state(), PipelineState::Failed);
    assert_eq!(source.close_calls(), 1);
}

#[tokio::test]
async fn test_unreachable_source() {
    let source = UnreachableSource::default();
    let provider = MockSearchProvider::default();
    let mut orchestrator = orchestrator(source.clone(), &provider, 10);

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::Connection(_)));
    assert_eq!(orchestrator.state(), PipelineState::Failed);
    assert_eq!(source.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_read_error_mid_stream() {
    let source = InMemorySource::new(days(5))
        .with_read_error_after(3, SourceError::query("cursor killed"));
    let provider = MockSearchProvider::default();
    let mut orchestrator = orchestrator(source.clone(), &provider, 2);

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::Query(_)));
    assert_eq!(orchestrator.state(), PipelineState::Failed);
    assert_eq!(provider.pushes().len(), 1);
    assert_eq!(source.close_calls(), 1);
}

#[tokio::test]
async fn test_rerun_replaces_index_contents() {
    let provider = MockSearchProvider::default();

    let mut first = orchestrator(
        InMemorySource::new(vec![day("a", "Golf", &[14]), day("b", "Golf", &[14])]),
        &provider,
        10,
    );
    first.run().await.unwrap();

    let mut second = orchestrator(
        InMemorySource::new(vec![day("a", "Chess", &[16])]),
        &provider,
        10,
    );
    second.run().await.unwrap();

    let stored = provider.stored(INDEX);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored["a"]["cat"], "Chess");
    assert_eq!(provider.state.lock().unwrap().deleted, vec![INDEX.to_string()]);
}

#[tokio::test]
async fn test_repeated_key_keeps_latest_values() {
    let provider = MockSearchProvider::default();
    let mut orchestrator = orchestrator(
        InMemorySource::new(vec![day("a", "Golf", &[14]), day("a", "Chess", &[16])]),
        &provider,
        1,
    );

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.pushed, 2);
    let stored = provider.stored(INDEX);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored["a"]["cat"], "Chess");
    assert_eq!(stored["a"]["avg_weight"], 16.0);
}

#[tokio::test]
async fn test_rejected_documents_are_counted() {
    let provider = MockSearchProvider {
        reject_keys: vec!["day-001".to_string()],
        ..Default::default()
    };
    let mut orchestrator = orchestrator(InMemorySource::new(days(4)), &provider, 10);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.pushed, 3);
    assert_eq!(summary.failed_documents, 1);
    assert_eq!(summary.failed_batches, 0);
    assert_eq!(orchestrator.state(), PipelineState::Done);
}

#[tokio::test]
async fn test_run_only_once() {
    let provider = MockSearchProvider::default();
    let mut orchestrator = orchestrator(InMemorySource::new(days(1)), &provider, 10);

    orchestrator.run().await.unwrap();

    assert!(orchestrator.run().await.is_err());
    assert_eq!(provider.pushes().len(), 1);
}
