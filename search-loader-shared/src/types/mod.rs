//! This module defines the core data structures and types used across the search loader.
//! It re-exports the schema, document, and synthetic record types.

pub mod index_document;
pub mod index_schema;
pub mod synthetic_day;

pub use index_document::IndexDocument;
pub use index_schema::{FieldDef, FieldType, IndexSchema, SchemaError, SchemaMismatch};
pub use synthetic_day::{Event, Owner, SyntheticDay};
