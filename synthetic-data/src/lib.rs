//! # Synthetic Data
//!
//! Generates nested `SyntheticDay` records and writes them to the document
//! store, giving the search loader realistic input for end-to-end runs.

pub mod generator;
pub mod persist;

pub use generator::{generate, generate_with_rng, DEFAULT_DAY_COUNT};
pub use persist::persist;

use search_loader_source::SourceError;
use thiserror::Error;

/// Errors from the `seed` binary.
#[derive(Error, Debug)]
pub enum SeedError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Document store error.
    #[error("Document store error: {0}")]
    Source(#[from] SourceError),
}

impl SeedError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
