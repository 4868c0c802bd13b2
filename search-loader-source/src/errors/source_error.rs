//! Document store error types.

use mongodb::error::ErrorKind;
use thiserror::Error;

/// Errors from reading or writing the document store.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The store could not be reached, or refused our credentials, within the
    /// configured timeout.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected a query or a write.
    #[error("Query error: {0}")]
    Query(String),

    /// A document could not be converted to or from BSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SourceError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<mongodb::error::Error> for SourceError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Authentication { .. }
            | ErrorKind::ConnectionPoolCleared { .. } => Self::Connection(err.to_string()),
            ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
                Self::Serialization(err.to_string())
            }
            _ => Self::Query(err.to_string()),
        }
    }
}

impl From<bson::ser::Error> for SourceError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bson::de::Error> for SourceError {
    fn from(err: bson::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
