//! Configuration types for the SearchIndexService.

/// Configuration for the SearchIndexService.
///
/// This struct controls the service-side limit on batch size. Use this to
/// prevent accidentally sending batches larger than the backend accepts in a
/// single request.
#[derive(Debug, Clone)]
pub struct SearchIndexServiceConfig {
    /// Maximum number of documents allowed in a single push.
    ///
    /// Set to `None` to disable the limit.
    /// Defaults to 1000, the largest batch Azure AI Search accepts.
    pub max_batch_size: Option<usize>,
}

impl Default for SearchIndexServiceConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Some(1000),
        }
    }
}

impl SearchIndexServiceConfig {
    /// Create a config with no batch size limit.
    ///
    /// # Warning
    ///
    /// Backends reject oversized requests on their own; without a limit the
    /// failure surfaces as a bulk error instead of a local one.
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
        }
    }

    /// Create a config with a custom batch size limit.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
        }
    }
}
