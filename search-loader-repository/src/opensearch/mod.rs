//! OpenSearch implementation of the search index provider.
//!
//! Index schemas become strict OpenSearch mappings; documents are upserted
//! through the `_bulk` API keyed by `_id`.

mod index_config;
mod provider;

pub use index_config::{get_index_settings, schema_from_mappings, IndexConfig};
pub use provider::OpenSearchProvider;
