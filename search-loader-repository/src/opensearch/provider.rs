//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode,
    },
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesGetMappingParts},
    BulkParts, OpenSearch,
};
use search_loader_shared::{IndexDocument, IndexSchema};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{get_index_settings, schema_from_mappings, IndexConfig};
use crate::types::{BatchOperationResult, BatchOperationSummary};

/// OpenSearch provider implementation.
///
/// Provides full-text search capabilities using OpenSearch as the backend.
///
/// # Example
///
/// ```ignore
/// use search_loader_repository::opensearch::{IndexConfig, OpenSearchProvider};
///
/// let provider = OpenSearchProvider::new(
///     "http://localhost:9200",
///     IndexConfig::default(),
///     Duration::from_secs(30),
/// ).await?;
///
/// // Creates the document if the key is new, replaces it otherwise
/// provider.bulk_upsert("synthetic-index", "id", &documents).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - Shard layout used when creating indexes
    /// * `timeout` - Timeout applied to every request
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(
        url: &str,
        index_config: IndexConfig,
        timeout: Duration,
    ) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            shards = index_config.number_of_shards,
            replicas = index_config.number_of_replicas,
            timeout_secs = timeout.as_secs(),
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Map a failed response to an error, reading its body for context.
    async fn error_from_response(
        response: Response,
        make_error: fn(String) -> SearchIndexError,
        action: &str,
    ) -> SearchIndexError {
        let status = response.status_code();
        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %error_body, action = action, "OpenSearch request failed");

        let message = format!("{} failed with status {}: {}", action, status, error_body);
        match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                SearchIndexError::throttled(message)
            }
            _ => make_error(message),
        }
    }

    /// Build the newline-delimited `_bulk` body: one `index` action keyed by
    /// `_id` followed by the document source, per document.
    fn bulk_body(key_field: &str, documents: &[IndexDocument]) -> Vec<JsonBody<Value>> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for doc in documents {
            body.push(json!({ "index": { "_id": doc.key } }).into());
            body.push(doc.to_json(key_field).into());
        }
        body
    }

    /// Turn the `items` array of a `_bulk` response into per-document results.
    ///
    /// Items are reported in request order.
    fn parse_bulk_response(documents: &[IndexDocument], response: &Value) -> BatchOperationSummary {
        let items = response
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let results = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let item = items.get(i).and_then(|item| item.get("index"));
                match item {
                    Some(item) if item.get("error").is_none() => {
                        BatchOperationResult::succeeded(doc.key.clone())
                    }
                    Some(item) => {
                        let reason = item
                            .get("error")
                            .and_then(|e| e.get("reason"))
                            .and_then(Value::as_str)
                            .unwrap_or("unknown error")
                            .to_string();
                        BatchOperationResult::failed(
                            doc.key.clone(),
                            SearchIndexError::bulk_index(reason),
                        )
                    }
                    None => BatchOperationResult::failed(
                        doc.key.clone(),
                        SearchIndexError::parse("Missing item in bulk response"),
                    ),
                }
            })
            .collect();

        BatchOperationSummary::from_results(results)
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn get_index_schema(&self, name: &str) -> Result<Option<IndexSchema>, SearchIndexError> {
        let response = self
            .client
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(
                Self::error_from_response(response, SearchIndexError::ParseError, "Get mapping")
                    .await,
            );
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        // The response is keyed by the concrete index name
        let mappings = body
            .as_object()
            .and_then(|indices| indices.values().next())
            .and_then(|index| index.get("mappings"))
            .ok_or_else(|| SearchIndexError::parse("Mapping response has no mappings"))?;

        schema_from_mappings(name, mappings).map(Some)
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchIndexError> {
        let body = get_index_settings(schema, &self.index_config)?;

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&schema.name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
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
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - index may not exist
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

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(Self::bulk_body(key_field, documents))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(Self::error_from_response(
                response,
                SearchIndexError::BulkIndexError,
                "Bulk index",
            )
            .await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::parse_bulk_response(documents, &body);
        debug!(
            index = %index,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk index completed"
        );
        Ok(summary)
    }

    async fn health_check(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(Self::error_from_response(
                response,
                SearchIndexError::ConnectionError,
                "Ping",
            )
            .await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documents() -> Vec<IndexDocument> {
        vec![
            IndexDocument::new("a").with_field("cat", "Chess"),
            IndexDocument::new("b").with_field("cat", "Golf"),
        ]
    }

    #[test]
    fn test_bulk_body_pairs_action_and_source() {
        let docs = documents();
        let body = OpenSearchProvider::bulk_body("id", &docs);
        assert_eq!(body.len(), 4);
    }

    #[test]
    fn test_parse_bulk_response_all_succeeded() {
        let response = json!({
            "took": 3,
            "errors": false,
            "items": [
                { "index": { "_id": "a", "status": 201 } },
                { "index": { "_id": "b", "status": 200 } }
            ]
        });

        let summary = OpenSearchProvider::parse_bulk_response(&documents(), &response);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_parse_bulk_response_partial_failure() {
        let response = json!({
            "took": 3,
            "errors": true,
            "items": [
                { "index": { "_id": "a", "status": 201 } },
                { "index": {
                    "_id": "b",
                    "status": 400,
                    "error": { "type": "strict_dynamic_mapping_exception", "reason": "mapping set to strict" }
                } }
            ]
        });

        let summary = OpenSearchProvider::parse_bulk_response(&documents(), &response);

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        let failure = summary.failures().next().unwrap();
        assert_eq!(failure.key, "b");
        assert!(matches!(
            failure.error,
            Some(SearchIndexError::BulkIndexError(ref reason)) if reason == "mapping set to strict"
        ));
    }

    #[test]
    fn test_parse_bulk_response_missing_items() {
        let summary = OpenSearchProvider::parse_bulk_response(&documents(), &json!({}));
        assert_eq!(summary.failed, 2);
    }
}
