//! # Search Loader Shared
//!
//! This crate defines shared data structures and types used across the search loader ecosystem.
//! It includes the index schema definition, the documents pushed to the index, and the
//! synthetic documents written to the source store for end-to-end testing.

pub mod types;

pub use types::index_document::IndexDocument;
pub use types::index_schema::{FieldDef, FieldType, IndexSchema, SchemaError, SchemaMismatch};
pub use types::synthetic_day::{Event, Owner, SyntheticDay};
