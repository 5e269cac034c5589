use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::{AggregateType, EventType};

/// Name used for aggregates seen in the store but absent from the catalog
pub const UNKNOWN_AGGREGATE_NAME: &str = "(unknown)";

/// One distinct entity instance of an aggregate with at least one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityUsage {
    pub aggregate_name: String,
    pub entity_id: String,
    pub event_count: u64,
    pub first_offset: i64,
    pub last_offset: i64,
    pub last_occurred: DateTime<Utc>,
}

/// Invocations of one event type attributed to one aggregate type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateUsage {
    pub aggregate: AggregateType,
    pub invocation_count: u64,
}

/// Usage of one event type across the whole event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUsageReport {
    pub event_type: EventType,
    pub invocation_count: u64,
    pub first_offset: i64,
    pub last_offset: i64,
    pub per_aggregate_usage: BTreeMap<Uuid, AggregateUsage>,
}

impl EventUsageReport {
    /// Per-aggregate usages, most invoked first
    pub fn aggregates_by_usage(&self) -> Vec<&AggregateUsage> {
        let mut usages: Vec<&AggregateUsage> = self.per_aggregate_usage.values().collect();
        usages.sort_by(|a, b| {
            b.invocation_count
                .cmp(&a.invocation_count)
                .then_with(|| a.aggregate.name.cmp(&b.aggregate.name))
        });
        usages
    }
}
