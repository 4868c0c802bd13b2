//! Orchestrator module for the search loader pipeline.
//!
//! Coordinates index setup, the source read, the transformer and the loader
//! for a single run.

use std::fmt;
use std::sync::Arc;

use bson::Document;
use futures::StreamExt;
use search_loader_repository::SearchIndexService;
use search_loader_shared::IndexSchema;
use search_loader_source::DocumentSource;
use tracing::{error, info, instrument, warn};

use crate::errors::{LoaderError, PipelineError};
use crate::loader::{BatchLoader, LoadSummary, LoaderConfig};
use crate::transformer::DocumentTransformer;

/// Lifecycle of a run.
///
/// `Idle → SchemaReady → Loading → Done`, or `Failed` from any step before
/// `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    SchemaReady,
    Loading,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::SchemaReady => "schema_ready",
            Self::Loading => "loading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counters for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Documents read from the source.
    pub read: usize,
    pub pushed: usize,
    /// Documents the transformer rejected.
    pub skipped: usize,
    pub failed_batches: usize,
    pub failed_documents: usize,
    pub batches: usize,
}

impl RunSummary {
    fn from_load(read: usize, load: LoadSummary) -> Self {
        Self {
            read,
            pushed: load.pushed,
            skipped: load.skipped,
            failed_batches: load.failed_batches,
            failed_documents: load.failed_documents,
            batches: load.batches,
        }
    }
}

/// Orchestrator that runs the load pipeline once.
///
/// The orchestrator:
/// - Recreates the index from the schema and verifies it
/// - Streams source documents through the transformer into the loader
/// - Closes the source on every exit path
pub struct Orchestrator {
    source: Box<dyn DocumentSource>,
    service: Arc<SearchIndexService>,
    schema: IndexSchema,
    transformer: DocumentTransformer,
    loader: Option<BatchLoader>,
    filter: Option<Document>,
    limit: Option<i64>,
    state: PipelineState,
}

impl Orchestrator {
    /// Create an orchestrator for one run over the whole source collection.
    pub fn new(
        source: Box<dyn DocumentSource>,
        service: Arc<SearchIndexService>,
        schema: IndexSchema,
        transformer: DocumentTransformer,
        config: LoaderConfig,
    ) -> Result<Self, LoaderError> {
        let loader = BatchLoader::new(service.clone(), schema.name.clone(), config)?
            .with_key_field(transformer.key_field());

        Ok(Self {
            source,
            service,
            schema,
            transformer,
            loader: Some(loader),
            filter: None,
            limit: None,
            state: PipelineState::Idle,
        })
    }

    /// Only load documents matching `filter`, at most `limit` of them.
    pub fn with_query(mut self, filter: Option<Document>, limit: Option<i64>) -> Self {
        self.filter = filter;
        self.limit = limit;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run the pipeline to completion.
    ///
    /// Transform failures and failed pushes are counted in the summary.
    /// Index setup failures and source failures end the run in `Failed`.
    #[instrument(skip(self), fields(index = %self.schema.name))]
    pub async fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let Some(loader) = self.loader.take() else {
            return Err(PipelineError::Service(format!(
                "Pipeline already ran and is {}",
                self.state
            )));
        };

        info!("Starting search loader pipeline");

        let result = self.execute(loader).await;

        if let Err(e) = self.source.close().await {
            warn!(error = %e, "Failed to close document source");
        }

        match result {
            Ok(summary) => {
                self.transition(PipelineState::Done);
                info!(
                    read = summary.read,
                    pushed = summary.pushed,
                    skipped = summary.skipped,
                    failed_batches = summary.failed_batches,
                    failed_documents = summary.failed_documents,
                    batches = summary.batches,
                    "Pipeline completed"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "Pipeline failed");
                self.transition(PipelineState::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, mut loader: BatchLoader) -> Result<RunSummary, PipelineError> {
        self.service.ensure_index(&self.schema).await?;
        self.transition(PipelineState::SchemaReady);

        let available = self.source.count(self.filter.clone()).await?;
        let expected = match self.limit {
            Some(limit) if limit > 0 => available.min(limit as u64),
            _ => available,
        };
        // The count only sizes progress reporting; the cursor decides what is read.
        if expected == 0 {
            warn!("Source reports no documents to load");
        } else {
            info!(documents = expected, "Loading documents");
            loader.set_expected(expected);
        }

        let mut documents = self.source.fetch(self.filter.clone(), self.limit).await?;
        self.transition(PipelineState::Loading);

        let mut read = 0;
        while let Some(document) = documents.next().await {
            let document = document?;
            read += 1;

            match self.transformer.transform(&document) {
                Ok(doc) => loader.add(doc).await,
                Err(e) => {
                    warn!(position = read, error = %e, "Skipping document");
                    loader.record_skipped();
                }
            }
        }
        drop(documents);

        let load = loader.finish().await;
        Ok(RunSummary::from_load(read, load))
    }

    fn transition(&mut self, next: PipelineState) {
        info!(from = %self.state, to = %next, "Pipeline state changed");
        self.state = next;
    }
}
