//! Azure AI Search provider implementation.
//!
//! Talks to the Azure AI Search REST API with an admin `api-key`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use search_loader_shared::{IndexDocument, IndexSchema};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{BatchOperationResult, BatchOperationSummary};

/// Default REST API version.
pub const DEFAULT_API_VERSION: &str = "2023-10-01-Preview";

/// Per-document outcome in a `docs/index` response.
#[derive(Debug, Deserialize)]
struct IndexingResult {
    key: String,
    status: bool,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
    #[serde(rename = "statusCode")]
    status_code: u16,
}

#[derive(Debug, Deserialize)]
struct IndexingResponse {
    value: Vec<IndexingResult>,
}

/// Azure AI Search provider implementation.
///
/// # Example
///
/// ```ignore
/// use search_loader_repository::azure::AzureSearchProvider;
///
/// let provider = AzureSearchProvider::from_service_name(
///     "my-search-service",
///     admin_key,
///     DEFAULT_API_VERSION,
///     Duration::from_secs(30),
/// )?;
/// provider.health_check().await?;
/// ```
pub struct AzureSearchProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
}

impl AzureSearchProvider {
    /// Create a provider for an explicit service endpoint
    /// (e.g. `https://my-service.search.windows.net`).
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SearchIndexError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| SearchIndexError::connection(format!("Invalid endpoint: {}", e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let endpoint = endpoint.as_str().trim_end_matches('/').to_string();
        let api_version = api_version.into();

        info!(
            endpoint = %endpoint,
            api_version = %api_version,
            timeout_secs = timeout.as_secs(),
            "Created Azure AI Search provider"
        );

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            api_version,
        })
    }

    /// Create a provider from the service name alone.
    pub fn from_service_name(
        service_name: &str,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SearchIndexError> {
        Self::new(
            &Self::service_endpoint(service_name),
            api_key,
            api_version,
            timeout,
        )
    }

    fn service_endpoint(service_name: &str) -> String {
        format!("https://{}.search.windows.net", service_name)
    }

    fn index_url(&self, name: &str) -> String {
        format!("{}/indexes/{}", self.endpoint, name)
    }

    /// Attach the credentials and api-version every call needs.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("api-key", &self.api_key)
            .query(&[("api-version", self.api_version.as_str())])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SearchIndexError> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))
    }

    async fn error_from_response(
        response: Response,
        make_error: fn(String) -> SearchIndexError,
        action: &str,
    ) -> SearchIndexError {
        let status = response.status();
        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %error_body, action = action, "Azure AI Search request failed");

        let message = format!("{} failed with status {}: {}", action, status, error_body);
        match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                SearchIndexError::throttled(message)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SearchIndexError::connection(message)
            }
            _ => make_error(message),
        }
    }

    /// Build the `docs/index` payload: every document as an `upload` action.
    fn upload_payload(key_field: &str, documents: &[IndexDocument]) -> Value {
        let actions: Vec<Value> = documents
            .iter()
            .map(|doc| {
                let mut action = doc.to_json(key_field);
                if let Value::Object(ref mut object) = action {
                    object.insert("@search.action".to_string(), json!("upload"));
                }
                action
            })
            .collect();
        json!({ "value": actions })
    }

    fn summarize(documents: &[IndexDocument], response: IndexingResponse) -> BatchOperationSummary {
        let mut by_key: HashMap<String, IndexingResult> = response
            .value
            .into_iter()
            .map(|result| (result.key.clone(), result))
            .collect();

        let results = documents
            .iter()
            .map(|doc| match by_key.remove(&doc.key) {
                Some(result) if result.status => BatchOperationResult::succeeded(doc.key.clone()),
                Some(result) => {
                    let message = format!(
                        "status {}: {}",
                        result.status_code,
                        result.error_message.unwrap_or_default()
                    );
                    let error = if result.status_code == 429 || result.status_code == 503 {
                        SearchIndexError::throttled(message)
                    } else {
                        SearchIndexError::bulk_index(message)
                    };
                    BatchOperationResult::failed(doc.key.clone(), error)
                }
                None => BatchOperationResult::failed(
                    doc.key.clone(),
                    SearchIndexError::parse("Missing document in indexing response"),
                ),
            })
            .collect();

        BatchOperationSummary::from_results(results)
    }
}

#[async_trait]
impl SearchIndexProvider for AzureSearchProvider {
    async fn get_index_schema(&self, name: &str) -> Result<Option<IndexSchema>, SearchIndexError> {
        let response = self.send(self.client.get(self.index_url(name))).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(
                Self::error_from_response(response, SearchIndexError::ParseError, "Get index")
                    .await,
            );
        }

        let schema: IndexSchema = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        Ok(Some(schema))
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchIndexError> {
        schema.validate()?;

        let response = self
            .send(self.client.put(self.index_url(&schema.name)).json(schema))
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(
                response,
                SearchIndexError::IndexCreationError,
                "Create index",
            )
            .await);
        }

        info!(index = %schema.name, fields = schema.fields.len(), "Index created");
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), SearchIndexError> {
        let response = self.send(self.client.delete(self.index_url(name))).await?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(Self::error_from_response(
                response,
                SearchIndexError::IndexDeletionError,
                "Delete index",
            )
            .await);
        }

        info!(index = %name, "Index deleted");
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        key_field: &str,
        documents: &[IndexDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if documents.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        let url = format!("{}/docs/index", self.index_url(index));
        let payload = Self::upload_payload(key_field, documents);
        let response = self.send(self.client.post(url).json(&payload)).await?;

        // 207 Multi-Status carries per-document failures in the same body shape as 200
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_response(
                response,
                SearchIndexError::BulkIndexError,
                "Index documents",
            )
            .await);
        }

        let body: IndexingResponse = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::summarize(documents, body);
        debug!(
            index = %index,
            status = %status,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Document upload completed"
        );
        Ok(summary)
    }

    async fn health_check(&self) -> Result<(), SearchIndexError> {
        let url = format!("{}/servicestats", self.endpoint);
        let response = self.send(self.client.get(url)).await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(
                response,
                SearchIndexError::ConnectionError,
                "Service stats",
            )
            .await);
        }
        Ok(())
    }
}
