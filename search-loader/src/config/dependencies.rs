//! Dependency initialization and wiring for the search loader.

use std::sync::Arc;

use search_loader_repository::opensearch::IndexConfig;
use search_loader_repository::{
    AzureSearchProvider, OpenSearchProvider, SearchIndexError, SearchIndexProvider,
    SearchIndexService, SearchIndexServiceConfig,
};
use search_loader_source::MongoStore;
use tracing::info;

use super::settings::{AzureLocation, LoaderSettings, SearchBackend};
use crate::errors::PipelineError;
use crate::orchestrator::Orchestrator;
use crate::transformer::{default_mappings, default_schema, DocumentTransformer};
use crate::IndexingError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Connect to the source and the search service and wire the pipeline.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError::ConfigError)` - If the search provider or the pipeline cannot be built
    /// * `Err(IndexingError::Pipeline)` - If the source or the search service is unreachable
    pub async fn new(settings: LoaderSettings) -> Result<Self, IndexingError> {
        info!(
            database = %settings.source.database,
            collection = %settings.source.collection,
            backend = ?settings.backend,
            index = %settings.index_name,
            batch_size = settings.loader.batch_size,
            max_retries = settings.loader.max_retries,
            "Initializing dependencies"
        );

        let service = Arc::new(Self::search_service(&settings).await?);
        service
            .health_check()
            .await
            .map_err(|e| PipelineError::Service(format!("Search service unreachable: {}", e)))?;
        info!("Search service reachable");

        let source = MongoStore::connect(&settings.source)
            .await
            .map_err(PipelineError::from)?;
        info!("Document store connection established");

        let schema = default_schema(settings.index_name.as_str());
        let transformer = DocumentTransformer::new(&schema, default_mappings())
            .map_err(|e| IndexingError::config(e.to_string()))?;

        let orchestrator = Orchestrator::new(
            Box::new(source),
            service,
            schema,
            transformer,
            settings.loader,
        )
        .map_err(|e| IndexingError::config(e.to_string()))?;

        Ok(Self { orchestrator })
    }

    /// Build the search service for the configured backend.
    ///
    /// Azure rejects pushes of more than 1000 documents, so the service keeps
    /// its default batch limit there. OpenSearch has no such limit.
    async fn search_service(settings: &LoaderSettings) -> Result<SearchIndexService, IndexingError> {
        let provider_error = |e: SearchIndexError| {
            IndexingError::config(format!("Failed to create search provider: {}", e))
        };

        let (provider, config) = match &settings.backend {
            SearchBackend::Azure {
                location,
                api_key,
                api_version,
            } => {
                let provider = match location {
                    AzureLocation::ServiceName(name) => AzureSearchProvider::from_service_name(
                        name,
                        api_key.as_str(),
                        api_version.as_str(),
                        settings.search_timeout,
                    ),
                    AzureLocation::Endpoint(endpoint) => AzureSearchProvider::new(
                        endpoint,
                        api_key.as_str(),
                        api_version.as_str(),
                        settings.search_timeout,
                    ),
                }
                .map_err(provider_error)?;
                let provider: Box<dyn SearchIndexProvider> = Box::new(provider);
                (provider, SearchIndexServiceConfig::default())
            }
            SearchBackend::OpenSearch { url } => {
                let provider =
                    OpenSearchProvider::new(url, IndexConfig::default(), settings.search_timeout)
                        .await
                        .map_err(provider_error)?;
                let provider: Box<dyn SearchIndexProvider> = Box::new(provider);
                (provider, SearchIndexServiceConfig::unlimited())
            }
        };

        Ok(SearchIndexService::with_config(provider, config))
    }
}
