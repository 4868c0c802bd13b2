//! MongoDB document store.
//!
//! Works against any server speaking the MongoDB wire protocol, including
//! Azure Cosmos DB for MongoDB.

use async_trait::async_trait;
use bson::{doc, Document};
use futures::StreamExt;
use mongodb::{options::ClientOptions, Client, Collection};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::SourceError;
use crate::interfaces::{DocumentSink, DocumentSource, DocumentStream};
use crate::mongo::config::MongoConfig;

/// Application name reported to the server.
const APP_NAME: &str = "search-loader";

/// MongoDB implementation of `DocumentSource` and `DocumentSink`.
pub struct MongoStore {
    client: Mutex<Option<Client>>,
    database: String,
    collection: String,
}

impl MongoStore {
    /// Connect and verify the server is reachable with a `ping`.
    ///
    /// # Returns
    ///
    /// * `Ok(MongoStore)` - A connected store
    /// * `Err(SourceError::Connection)` - If the connection string is invalid or no
    ///   server answered within `config.timeout`
    pub async fn connect(config: &MongoConfig) -> Result<Self, SourceError> {
        let mut options = ClientOptions::parse(config.connection_string.as_str())
            .await
            .map_err(|e| SourceError::connection(format!("Invalid connection string: {}", e)))?;
        options.app_name = Some(APP_NAME.to_string());
        options.server_selection_timeout = Some(config.timeout);
        options.connect_timeout = Some(config.timeout);

        let client = Client::with_options(options)
            .map_err(|e| SourceError::connection(e.to_string()))?;

        client
            .database(&config.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SourceError::connection(e.to_string()))?;

        info!(
            database = %config.database,
            collection = %config.collection,
            timeout_secs = config.timeout.as_secs(),
            "Connected to document store"
        );

        Ok(Self {
            client: Mutex::new(Some(client)),
            database: config.database.clone(),
            collection: config.collection.clone(),
        })
    }

    async fn collection(&self) -> Result<Collection<Document>, SourceError> {
        let guard = self.client.lock().await;
        let client = guard
            .as_ref()
            .ok_or_else(|| SourceError::connection("Document store client is closed"))?;
        Ok(client.database(&self.database).collection(&self.collection))
    }

    /// Shut the client down. Open cursors must be dropped first.
    async fn shutdown(&self) {
        let client = self.client.lock().await.take();
        match client {
            Some(client) => {
                client.shutdown().await;
                info!(database = %self.database, "Document store client closed");
            }
            None => debug!("Document store client already closed"),
        }
    }
}

/// `None` means all documents.
fn filter_or_all(filter: Option<Document>) -> Document {
    filter.unwrap_or_default()
}

#[async_trait]
impl DocumentSource for MongoStore {
    async fn count(&self, filter: Option<Document>) -> Result<u64, SourceError> {
        let collection = self.collection().await?;
        let count = collection.count_documents(filter_or_all(filter)).await?;
        debug!(collection = %self.collection, count = count, "Counted documents");
        Ok(count)
    }

    async fn fetch(
        &self,
        filter: Option<Document>,
        limit: Option<i64>,
    ) -> Result<DocumentStream, SourceError> {
        let collection = self.collection().await?;

        let mut find = collection.find(filter_or_all(filter));
        if let Some(limit) = limit {
            find = find.limit(limit);
        }
        let cursor = find.await?;

        debug!(collection = %self.collection, limit = ?limit, "Opened cursor");
        Ok(cursor.map(|item| item.map_err(SourceError::from)).boxed())
    }

    async fn close(&self) -> Result<(), SourceError> {
        self.shutdown().await;
        Ok(())
    }
}

#[async_trait]
impl DocumentSink for MongoStore {
    async fn insert_many(&self, documents: Vec<Document>) -> Result<usize, SourceError> {
        if documents.is_empty() {
            warn!("No documents to insert");
            return Ok(0);
        }

        let collection = self.collection().await?;
        let result = collection.insert_many(documents).await?;
        let inserted = result.inserted_ids.len();

        info!(collection = %self.collection, inserted = inserted, "Inserted documents");
        Ok(inserted)
    }

    async fn close(&self) -> Result<(), SourceError> {
        self.shutdown().await;
        Ok(())
    }
}
