//! MongoDB implementation of the document store traits.

mod config;
mod store;

pub use config::{MongoConfig, DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_TIMEOUT};
pub use store::MongoStore;
