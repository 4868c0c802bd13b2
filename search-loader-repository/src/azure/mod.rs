//! Azure AI Search implementation of the search index provider.
//!
//! Index schemas are sent as-is to `PUT /indexes/{name}`; documents are
//! pushed as `upload` actions, which replace any document with the same key.

mod provider;

pub use provider::{AzureSearchProvider, DEFAULT_API_VERSION};
