use chrono::{DateTime, Utc};
use elog_types::{AggregateType, EventFired, EventRecord, TypeCatalog};

/// Decide whether a live record is an event of the watched aggregate.
///
/// The event type must be in the catalog under its exact (case-insensitive) id.
pub fn match_fired_event(
    aggregate: &AggregateType,
    catalog: &TypeCatalog,
    record: &EventRecord,
    event_store: &str,
    detected: DateTime<Utc>,
) -> Option<EventFired> {
    if !record.applied_by_aggregate || record.aggregate_type_id != aggregate.id {
        return None;
    }
    let stored = record.event_type_id.to_string();
    let event = catalog
        .events
        .iter()
        .find(|e| e.id.trim().eq_ignore_ascii_case(&stored))?;

    Some(EventFired {
        offset: record.offset,
        aggregate_name: aggregate.name.clone(),
        event_name: event.name.clone(),
        occurred: record.occurred,
        detected,
        event_store: event_store.to_string(),
    })
}
