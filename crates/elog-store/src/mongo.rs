use std::time::Duration;

use async_trait::async_trait;
use elog_types::EventRecord;
use futures::future;
use futures::stream::StreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, ServerAddress};
use mongodb::{Client, Collection};
use tracing::{debug, warn};

use crate::document::decode_record;
use crate::error::{Error, Result};
use crate::query::RecordQuery;
use crate::reader::{EventStore, RecordStream};

pub const DEFAULT_PORT: u16 = 27017;
pub const DEFAULT_COLLECTION: &str = "event-log";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the event log lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub collection: String,
    /// Bounds both connecting and server selection
    pub timeout: Duration,
}

impl StoreSettings {
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            database: database.into(),
            collection: DEFAULT_COLLECTION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::default();
        options.hosts = vec![ServerAddress::Tcp {
            host: self.host.clone(),
            port: Some(self.port),
        }];
        options.app_name = Some("elog".to_string());
        options.connect_timeout = Some(self.timeout);
        options.server_selection_timeout = Some(self.timeout);
        options
    }
}

/// Event log stored in a MongoDB collection. One client per run.
pub struct MongoEventStore {
    client: Client,
    collection: Collection<Document>,
    settings: StoreSettings,
}

impl MongoEventStore {
    /// Connect and verify the server answers within the configured timeout
    pub async fn connect(settings: StoreSettings) -> Result<Self> {
        let unavailable = |source| Error::StoreUnavailable {
            address: settings.address(),
            source,
        };
        let client = Client::with_options(settings.client_options()).map_err(unavailable)?;
        client
            .database(&settings.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(unavailable)?;
        debug!(address = %settings.address(), database = %settings.database, "Connected to event store");

        let collection = client
            .database(&settings.database)
            .collection::<Document>(&settings.collection);
        Ok(Self {
            client,
            collection,
            settings,
        })
    }

    /// Records inserted from now on, in arrival order. Undecodable documents are skipped.
    pub async fn watch_records(&self) -> Result<RecordStream> {
        let changes = self
            .collection
            .watch()
            .pipeline([doc! { "$match": { "operationType": "insert" } }])
            .await?;
        let records = changes.filter_map(|change| async move {
            match change {
                Ok(event) => decoded(&event.full_document?, "inserted").map(Ok),
                Err(err) => Some(Err(Error::Database(err))),
            }
        });
        Ok(records.boxed())
    }

    /// Release the connection pool
    pub async fn close(self) {
        self.client.shutdown().await;
    }
}

#[async_trait]
impl EventStore for MongoEventStore {
    fn name(&self) -> &str {
        &self.settings.database
    }

    async fn find(&self, query: &RecordQuery) -> Result<RecordStream> {
        let filter = query.to_document();
        debug!(filter = %filter, "Querying event log");
        let mut find = self.collection.find(filter);
        if let Some(sort) = query.sort() {
            find = find.sort(sort);
        }
        let cursor = find.await?;
        let records = cursor.filter_map(|doc| {
            future::ready(match doc {
                Ok(doc) => decoded(&doc, "stored").map(Ok),
                Err(err) => Some(Err(Error::Database(err))),
            })
        });
        Ok(records.boxed())
    }
}

/// Decode one document, logging and dropping it when required fields are missing
fn decoded(doc: &Document, kind: &str) -> Option<EventRecord> {
    match decode_record(doc) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(id = ?doc.get("_id"), "Skipping {} document: {}", kind, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_to_event_log_collection() {
        let settings = StoreSettings::new("localhost", "event_store");
        assert_eq!(settings.address(), "localhost:27017");
        assert_eq!(settings.collection, "event-log");
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn client_options_carry_timeouts() {
        let mut settings = StoreSettings::new("mongo.internal", "es");
        settings.port = 27018;
        settings.timeout = Duration::from_secs(2);
        let options = settings.client_options();

        assert_eq!(
            options.hosts,
            vec![ServerAddress::Tcp {
                host: "mongo.internal".to_string(),
                port: Some(27018)
            }]
        );
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(2)));
        assert_eq!(options.server_selection_timeout, Some(Duration::from_secs(2)));
    }
}
