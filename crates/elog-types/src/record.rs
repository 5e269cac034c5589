use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One raw entry of the event log, as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Store-assigned, monotonically increasing sequence offset (`_id`)
    pub offset: i64,
    /// Entity instance the event was applied to (`Metadata.EventSource`)
    pub entity_id: String,
    /// Aggregate root type that committed the event (`Aggregate.TypeId`)
    pub aggregate_type_id: Uuid,
    /// `Aggregate.WasAppliedByAggregate`
    pub applied_by_aggregate: bool,
    /// `Metadata.TypeId`
    pub event_type_id: Uuid,
    /// `Metadata.Occurred`
    pub occurred: DateTime<Utc>,
    /// `Metadata.Public`
    pub public: bool,
    /// `Content`, kept opaque
    pub content: Value,
}

/// One step in the reconstructed history of a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHistoryEntry {
    pub offset: i64,
    pub aggregate_name: String,
    pub event_type_id: Uuid,
    /// `None` when the event type id is not in the catalog
    pub event_name: Option<String>,
    pub occurred: DateTime<Utc>,
    pub public: bool,
    pub payload: Value,
}

impl EventHistoryEntry {
    /// Display name: the event name, or the raw type id when unknown
    pub fn display_name(&self) -> String {
        match &self.event_name {
            Some(name) => name.clone(),
            None => self.event_type_id.to_string(),
        }
    }
}

/// A record observed live on the store's change stream that belongs to the watched aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFired {
    pub offset: i64,
    pub aggregate_name: String,
    pub event_name: String,
    pub occurred: DateTime<Utc>,
    pub detected: DateTime<Utc>,
    pub event_store: String,
}
