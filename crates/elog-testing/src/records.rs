//! Event log record fixtures.

use chrono::{DateTime, Duration, TimeZone, Utc};
use elog_types::EventRecord;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::fixtures;

/// Fixed point all fixture timestamps are offset from
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid fixture epoch")
}

pub fn product_aggregate_id() -> Uuid {
    Uuid::parse_str(fixtures::PRODUCT_ID).expect("valid fixture id")
}

pub fn product_created_id() -> Uuid {
    Uuid::parse_str(fixtures::PRODUCT_CREATED_ID).expect("valid fixture id")
}

pub fn product_renamed_id() -> Uuid {
    Uuid::parse_str(fixtures::PRODUCT_RENAMED_ID).expect("valid fixture id")
}

/// Fluent builder for one [`EventRecord`]. Applied by an aggregate and private by default.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: EventRecord,
}

impl RecordBuilder {
    pub fn new(offset: i64, entity_id: &str, aggregate: Uuid, event_type: Uuid) -> Self {
        Self {
            record: EventRecord {
                offset,
                entity_id: entity_id.to_string(),
                aggregate_type_id: aggregate,
                applied_by_aggregate: true,
                event_type_id: event_type,
                occurred: epoch() + Duration::seconds(offset),
                public: false,
                content: json!({ "offset": offset }),
            },
        }
    }

    pub fn not_applied(mut self) -> Self {
        self.record.applied_by_aggregate = false;
        self
    }

    pub fn public(mut self) -> Self {
        self.record.public = true;
        self
    }

    pub fn occurred(mut self, at: DateTime<Utc>) -> Self {
        self.record.occurred = at;
        self
    }

    pub fn content(mut self, content: Value) -> Self {
        self.record.content = content;
        self
    }

    pub fn build(self) -> EventRecord {
        self.record
    }
}

/// Product records for entities X (3 events) and Y (2 events), interleaved, X seen first
pub fn product_log() -> Vec<EventRecord> {
    let product = product_aggregate_id();
    let created = product_created_id();
    let renamed = product_renamed_id();
    vec![
        RecordBuilder::new(1, "x", product, created).build(),
        RecordBuilder::new(2, "y", product, created).build(),
        RecordBuilder::new(3, "x", product, renamed).public().build(),
        RecordBuilder::new(4, "y", product, renamed).build(),
        RecordBuilder::new(5, "x", product, renamed).build(),
    ]
}
