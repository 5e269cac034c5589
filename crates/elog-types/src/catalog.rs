use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::IdMatching;

/// Aggregate root discovered in a binary: a class deriving from the aggregate root base type
/// and carrying the aggregate root marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateType {
    pub id: Uuid,
    pub name: String,
}

impl AggregateType {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Which marker an [`EventType`] was discovered through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Event,
    Projection,
}

/// Event or projection type discovered in a binary.
///
/// The id is kept as declared (a string); the store encodes it as a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventType {
    pub id: String,
    pub name: String,
    pub kind: EventKind,
}

impl EventType {
    pub fn event(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EventKind::Event,
        }
    }

    pub fn projection(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EventKind::Projection,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.id)
    }
}

/// Output of one discovery run over one binaries folder.
///
/// Events and projections share the `events` collection, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCatalog {
    pub selected_aggregate: Option<AggregateType>,
    pub aggregates: Vec<AggregateType>,
    pub events: Vec<EventType>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a discovered aggregate by name (case-insensitive)
    pub fn find_aggregate(&self, name: &str) -> Option<&AggregateType> {
        self.aggregates
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Find an event or projection type by name (case-insensitive)
    pub fn find_event(&self, name: &str) -> Option<&EventType> {
        self.events.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Resolve the event type for an id read from the store.
    ///
    /// First match in discovery order wins, whether it is an event or a projection.
    pub fn resolve_event(&self, stored_id: &str, matching: IdMatching) -> Option<&EventType> {
        self.events
            .iter()
            .find(|e| matching.matches(&e.id, stored_id))
    }

    /// Mark the aggregate named `name` as selected. Returns the selection, if any.
    pub fn select_aggregate(&mut self, name: &str) -> Option<&AggregateType> {
        self.selected_aggregate = self.find_aggregate(name).cloned();
        self.selected_aggregate.as_ref()
    }
}
