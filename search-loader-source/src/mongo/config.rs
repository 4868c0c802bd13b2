//! Connection settings for the MongoDB store.

use std::time::Duration;

/// Default database holding the synthetic documents.
pub const DEFAULT_DATABASE: &str = "Synthetic_Data_DB";

/// Default collection holding the synthetic documents.
pub const DEFAULT_COLLECTION: &str = "Synthetic_Data_COL";

/// Default server selection and connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the documents live and how long to wait for the server.
#[derive(Clone)]
pub struct MongoConfig {
    pub connection_string: String,
    pub database: String,
    pub collection: String,
    pub timeout: Duration,
}

impl MongoConfig {
    /// Config for the default database and collection.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_namespace(mut self, database: impl Into<String>, collection: impl Into<String>) -> Self {
        self.database = database.into();
        self.collection = collection.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// The connection string carries credentials; keep it out of logs.
impl std::fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConfig")
            .field("connection_string", &"<redacted>")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("timeout", &self.timeout)
            .finish()
    }
}
