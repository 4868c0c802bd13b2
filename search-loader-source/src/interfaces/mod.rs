//! Interface definitions for the document store.
//!
//! `DocumentSource` is the read side used by the loader; `DocumentSink` is the
//! write side used by the synthetic data generator.

mod document_store;

pub use document_store::{DocumentSink, DocumentSource, DocumentStream};
