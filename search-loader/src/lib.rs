//! # Search Loader
//!
//! Bulk loader that reads documents from a MongoDB-compatible store, flattens
//! them, and pushes them into a search index (Azure AI Search or OpenSearch).
//!
//! ## Architecture
//!
//! A run follows the Source-Transformer-Loader pattern:
//!
//! 1. **Index setup**: The target index is recreated from its schema and verified
//! 2. **Source**: Documents are streamed from the store in natural order
//! 3. **Transformer**: Each document is flattened into an index document
//! 4. **Loader**: Index documents are pushed in fixed-size batches
//! 5. **Orchestrator**: Drives the run and reports the summary
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`transformer`]: Source document to index document mapping
//! - [`loader`]: Batched pushes into the search index
//! - [`orchestrator`]: Coordinates a single run
//! - [`errors`]: Error types for the pipeline

pub mod config;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod transformer;

pub use config::{Dependencies, LoaderSettings};
pub use errors::PipelineError;
pub use orchestrator::{Orchestrator, PipelineState, RunSummary};

use thiserror::Error;

/// Errors that can occur during loader initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The pipeline failed.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
