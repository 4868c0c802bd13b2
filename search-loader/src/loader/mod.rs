//! Loader module for the search loader pipeline.
//!
//! Buffers transformed documents and pushes them to the search index in
//! fixed-size batches, one bulk upsert call per batch.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use search_loader_repository::{BatchOperationSummary, SearchIndexError, SearchIndexService};
use search_loader_shared::IndexDocument;
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tracing::{debug, error, info, instrument, warn};

use crate::errors::LoaderError;
use crate::transformer::DEFAULT_KEY_FIELD;

/// Configuration for the batch loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Number of documents per push.
    pub batch_size: usize,
    /// Extra attempts for a push that failed with a retryable error.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on every further attempt.
    pub initial_retry_delay_ms: u64,
    /// Upper bound for the retry delay.
    pub max_retry_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_retries: 0,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

/// Counters for one load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Documents the index accepted.
    pub pushed: usize,
    /// Documents dropped before reaching the loader.
    pub skipped: usize,
    /// Pushes that failed as a whole.
    pub failed_batches: usize,
    /// Documents rejected individually inside an otherwise accepted push.
    pub failed_documents: usize,
    /// Push calls made, failed ones included.
    pub batches: usize,
}

/// Loader that pushes documents into the search index in batches.
///
/// A failed push is logged and counted; loading continues with the next
/// batch.
pub struct BatchLoader {
    service: Arc<SearchIndexService>,
    index_name: String,
    key_field: String,
    config: LoaderConfig,
    pending: Vec<IndexDocument>,
    expected_batches: Option<usize>,
    summary: LoadSummary,
}

impl BatchLoader {
    /// Create a loader for `index_name`.
    ///
    /// The batch size must be positive and within the service's batch limit.
    pub fn new(
        service: Arc<SearchIndexService>,
        index_name: impl Into<String>,
        config: LoaderConfig,
    ) -> Result<Self, LoaderError> {
        if config.batch_size == 0 {
            return Err(LoaderError::invalid_config("batch_size must be at least 1"));
        }
        if let Some(max) = service.max_batch_size() {
            if config.batch_size > max {
                return Err(LoaderError::invalid_config(format!(
                    "batch_size {} exceeds the service limit of {}",
                    config.batch_size, max
                )));
            }
        }

        Ok(Self {
            service,
            index_name: index_name.into(),
            key_field: DEFAULT_KEY_FIELD.to_string(),
            pending: Vec::with_capacity(config.batch_size),
            config,
            expected_batches: None,
            summary: LoadSummary::default(),
        })
    }

    /// Write document keys under `key_field` instead of the default `id`.
    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = key_field.into();
        self
    }

    /// Announce how many documents will be added so progress logs can show
    /// the batch total.
    pub fn set_expected(&mut self, documents: u64) {
        let batch_size = self.config.batch_size as u64;
        self.expected_batches = Some(documents.div_ceil(batch_size) as usize);
    }

    /// Counters so far. Buffered documents are not counted until pushed.
    pub fn summary(&self) -> &LoadSummary {
        &self.summary
    }

    /// Buffer a document, pushing the buffer once it holds a full batch.
    pub async fn add(&mut self, document: IndexDocument) {
        self.pending.push(document);
        if self.pending.len() >= self.config.batch_size {
            self.flush().await;
        }
    }

    /// Count a document that was dropped before it reached the loader.
    pub fn record_skipped(&mut self) {
        self.summary.skipped += 1;
    }

    /// Push whatever is buffered and return the final counters.
    #[instrument(skip(self), fields(index = %self.index_name))]
    pub async fn finish(mut self) -> LoadSummary {
        self.flush().await;
        info!(
            pushed = self.summary.pushed,
            skipped = self.summary.skipped,
            failed_batches = self.summary.failed_batches,
            failed_documents = self.summary.failed_documents,
            batches = self.summary.batches,
            "Load finished"
        );
        self.summary
    }

    /// Add every document of `documents`, then finish.
    pub async fn load<S>(mut self, documents: S) -> LoadSummary
    where
        S: Stream<Item = IndexDocument>,
    {
        let mut documents = std::pin::pin!(documents);
        while let Some(document) = documents.next().await {
            self.add(document).await;
        }
        self.finish().await
    }

    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let batch: Vec<IndexDocument> = self.pending.drain(..).collect();
        self.summary.batches += 1;
        let number = self.summary.batches;

        match self.expected_batches {
            Some(total) => info!(
                "Pushing batch {}/{} ({} documents)",
                number,
                total.max(number),
                batch.len()
            ),
            None => info!("Pushing batch {} ({} documents)", number, batch.len()),
        }

        match self.push_with_retry(&batch).await {
            Ok(result) => self.record_result(&result, batch.len()),
            Err(e) => {
                self.summary.failed_batches += 1;
                error!(
                    batch = number,
                    count = batch.len(),
                    error = %e,
                    "Failed to push batch"
                );
            }
        }
    }

    fn record_result(&mut self, result: &BatchOperationSummary, sent: usize) {
        if result.failed == 0 {
            self.summary.pushed += sent;
            debug!(count = sent, "Batch accepted");
            return;
        }

        self.summary.pushed += sent.saturating_sub(result.failed);
        self.summary.failed_documents += result.failed;
        warn!(
            succeeded = result.succeeded,
            failed = result.failed,
            "Batch pushed with some rejected documents"
        );
        for failure in result.failures() {
            if let Some(ref err) = failure.error {
                error!(key = %failure.key, error = %err, "Document rejected");
            }
        }
    }

    async fn push_with_retry(
        &self,
        batch: &[IndexDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        // The backoff base is the growth rate; the factor scales it so the
        // first delay equals `initial_retry_delay_ms`.
        let retry = ExponentialBackoff::from_millis(2)
            .factor(self.config.initial_retry_delay_ms.div_ceil(2).max(1))
            .max_delay(Duration::from_millis(self.config.max_retry_delay_ms))
            .take(self.config.max_retries as usize);

        let service = &self.service;
        let (index_name, key_field) = (self.index_name.as_str(), self.key_field.as_str());
        let max_retries = self.config.max_retries;
        let mut attempt = 0u32;

        RetryIf::spawn(
            retry,
            move || {
                if attempt > 0 {
                    warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        count = batch.len(),
                        "Push failed, retrying"
                    );
                }
                attempt += 1;
                service.push_batch(index_name, key_field, batch)
            },
            SearchIndexError::is_retryable,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use search_loader_repository::{
        BatchOperationResult, SearchIndexProvider, SearchIndexServiceConfig,
    };
    use search_loader_shared::IndexSchema;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider that records the keys of every push and replays scripted
    /// failures before accepting. Clones share their state.
    #[derive(Clone, Default)]
    struct RecordingProvider {
        pushes: Arc<Mutex<Vec<Vec<String>>>>,
        pushed_at: Arc<Mutex<Vec<tokio::time::Instant>>>,
        failures: Arc<Mutex<VecDeque<SearchIndexError>>>,
        reject_keys: Vec<String>,
    }

    impl RecordingProvider {
        fn failing_with(errors: Vec<SearchIndexError>) -> Self {
            let provider = Self::default();
            provider.failures.lock().unwrap().extend(errors);
            provider
        }

        fn push_sizes(&self) -> Vec<usize> {
            self.pushes.lock().unwrap().iter().map(Vec::len).collect()
        }

        fn gaps_ms(&self) -> Vec<u128> {
            let times = self.pushed_at.lock().unwrap();
            times.windows(2).map(|w| (w[1] - w[0]).as_millis()).collect()
        }
    }

    #[async_trait]
    impl SearchIndexProvider for RecordingProvider {
        async fn get_index_schema(
            &self,
            _name: &str,
        ) -> Result<Option<IndexSchema>, SearchIndexError> {
            Ok(None)
        }

        async fn create_index(&self, _schema: &IndexSchema) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn delete_index(&self, _name: &str) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn bulk_upsert(
            &self,
            _index: &str,
            _key_field: &str,
            documents: &[IndexDocument],
        ) -> Result<BatchOperationSummary, SearchIndexError> {
            self.pushes
                .lock()
                .unwrap()
                .push(documents.iter().map(|d| d.key.clone()).collect());
            self.pushed_at.lock().unwrap().push(tokio::time::Instant::now());

            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }

            Ok(BatchOperationSummary::from_results(
                documents
                    .iter()
                    .map(|d| {
                        if self.reject_keys.contains(&d.key) {
                            BatchOperationResult::failed(
                                d.key.clone(),
                                SearchIndexError::bulk_index("rejected"),
                            )
                        } else {
                            BatchOperationResult::succeeded(d.key.clone())
                        }
                    })
                    .collect(),
            ))
        }

        async fn health_check(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }
    }

    fn loader(provider: &RecordingProvider, config: LoaderConfig) -> BatchLoader {
        let service = Arc::new(SearchIndexService::new(Box::new(provider.clone())));
        BatchLoader::new(service, "idx", config).unwrap()
    }

    fn docs(n: usize) -> Vec<IndexDocument> {
        (0..n).map(|i| IndexDocument::new(format!("doc-{}", i))).collect()
    }

    fn config(batch_size: usize) -> LoaderConfig {
        LoaderConfig {
            batch_size,
            ..Default::default()
        }
    }

    fn retrying(batch_size: usize) -> LoaderConfig {
        LoaderConfig {
            batch_size,
            max_retries: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_batch_sizes() {
        let service = Arc::new(SearchIndexService::new(Box::new(RecordingProvider::default())));
        assert!(matches!(
            BatchLoader::new(service.clone(), "idx", config(0)),
            Err(LoaderError::InvalidConfig(_))
        ));
        assert!(BatchLoader::new(service, "idx", config(1001)).is_err());

        let unlimited = Arc::new(SearchIndexService::with_config(
            Box::new(RecordingProvider::default()),
            SearchIndexServiceConfig::unlimited(),
        ));
        assert!(BatchLoader::new(unlimited, "idx", config(5000)).is_ok());
    }

    #[tokio::test]
    async fn test_batches_are_full_except_the_last() {
        let provider = RecordingProvider::default();

        let summary = loader(&provider, config(3)).load(stream::iter(docs(7))).await;

        assert_eq!(provider.push_sizes(), vec![3, 3, 1]);
        assert_eq!(
            provider.pushes.lock().unwrap()[0],
            vec!["doc-0", "doc-1", "doc-2"]
        );
        assert_eq!(summary.pushed, 7);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.failed_batches, 0);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_push() {
        let provider = RecordingProvider::default();

        let summary = loader(&provider, config(2)).load(stream::iter(docs(4))).await;

        assert_eq!(provider.push_sizes(), vec![2, 2]);
        assert_eq!(summary.pushed, 4);
    }

    #[tokio::test]
    async fn test_finish_without_documents() {
        let provider = RecordingProvider::default();

        let summary = loader(&provider, config(2)).finish().await;

        assert!(provider.push_sizes().is_empty());
        assert_eq!(summary, LoadSummary::default());
    }

    #[tokio::test]
    async fn test_failed_push_is_counted_and_loading_continues() {
        let provider =
            RecordingProvider::failing_with(vec![SearchIndexError::bulk_index("read-only")]);

        let summary = loader(&provider, config(2)).load(stream::iter(docs(5))).await;

        assert_eq!(provider.push_sizes(), vec![2, 2, 1]);
        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.pushed, 3);
        assert_eq!(summary.batches, 3);
    }

    #[tokio::test]
    async fn test_rejected_documents() {
        let provider = RecordingProvider {
            reject_keys: vec!["doc-1".to_string()],
            ..Default::default()
        };

        let summary = loader(&provider, config(10)).load(stream::iter(docs(3))).await;

        assert_eq!(summary.pushed, 2);
        assert_eq!(summary.failed_documents, 1);
        assert_eq!(summary.failed_batches, 0);
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let provider = RecordingProvider::failing_with(vec![SearchIndexError::throttled("429")]);

        let summary = loader(&provider, config(5)).load(stream::iter(docs(2))).await;

        assert_eq!(provider.push_sizes(), vec![2]);
        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.pushed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_errors_are_retried() {
        let provider = RecordingProvider::failing_with(vec![
            SearchIndexError::throttled("429"),
            SearchIndexError::connection("reset"),
        ]);

        let summary = loader(&provider, retrying(5)).load(stream::iter(docs(2))).await;

        assert_eq!(provider.push_sizes(), vec![2, 2, 2]);
        assert_eq!(summary.failed_batches, 0);
        assert_eq!(summary.pushed, 2);
        assert_eq!(summary.batches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_give_up() {
        let provider = RecordingProvider::failing_with(
            (0..5).map(|_| SearchIndexError::throttled("429")).collect(),
        );

        let summary = loader(&provider, retrying(5)).load(stream::iter(docs(2))).await;

        assert_eq!(provider.push_sizes().len(), 4);
        assert_eq!(summary.failed_batches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delays_double_up_to_the_cap() {
        let provider = RecordingProvider::failing_with(
            (0..3).map(|_| SearchIndexError::throttled("429")).collect(),
        );
        let config = LoaderConfig {
            batch_size: 5,
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 250,
        };

        let summary = loader(&provider, config).load(stream::iter(docs(2))).await;

        assert_eq!(provider.gaps_ms(), vec![100, 200, 250]);
        assert_eq!(summary.pushed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_errors_are_not_retried() {
        let provider =
            RecordingProvider::failing_with(vec![SearchIndexError::bulk_index("mapping conflict")]);

        let summary = loader(&provider, retrying(5)).load(stream::iter(docs(2))).await;

        assert_eq!(provider.push_sizes(), vec![2]);
        assert_eq!(summary.failed_batches, 1);
    }

    #[tokio::test]
    async fn test_skips_and_expected_total() {
        let provider = RecordingProvider::default();
        let mut loader = loader(&provider, config(2));
        loader.set_expected(3);
        assert_eq!(loader.expected_batches, Some(2));

        loader.add(IndexDocument::new("a")).await;
        loader.record_skipped();
        loader.add(IndexDocument::new("b")).await;
        assert_eq!(loader.summary().pushed, 2);

        let summary = loader.finish().await;
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.pushed, 2);
        assert_eq!(summary.batches, 1);
    }
}
