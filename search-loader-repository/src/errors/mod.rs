//! Error types for the search loader repository.

mod search_index_error;

pub use search_index_error::SearchIndexError;
