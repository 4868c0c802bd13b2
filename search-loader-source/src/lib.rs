//! # Search Loader Source
//!
//! This crate provides traits and implementations for reading documents from,
//! and writing documents to, the source document store. It includes the
//! MongoDB store used in production and an in-memory store for tests.

pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod mongo;

pub use errors::SourceError;
pub use interfaces::{DocumentSink, DocumentSource, DocumentStream};
pub use memory::InMemorySource;
pub use mongo::{MongoConfig, MongoStore};
