//! # Search Loader Repository
//!
//! This crate provides traits and implementations for interacting with the
//! search index. It includes definitions for errors, interfaces, and concrete
//! implementations for OpenSearch and Azure AI Search.

pub mod azure;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod service;
pub mod types;

pub use azure::AzureSearchProvider;
pub use config::SearchIndexServiceConfig;
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use opensearch::OpenSearchProvider;
pub use service::SearchIndexService;
pub use types::{BatchOperationResult, BatchOperationSummary};
