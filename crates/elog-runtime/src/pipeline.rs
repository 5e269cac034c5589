// Query stage: catalog entries become store queries, records are folded by the engine as
// they stream in. Every function takes the reader as a trait object so the same code runs
// against MongoDB and the in-memory store.

use chrono::Utc;
use elog_engine::{
    EntityAccumulator, EntityLookup, EventUsageAccumulator, build_history, find_entity,
    match_fired_event,
};
use elog_store::{EventStore, RecordQuery};
use elog_types::{
    AggregateType, EntityUsage, EventFired, EventHistoryEntry, EventRecord, EventUsageReport,
    IdMatching, TypeCatalog,
};
use futures::{Stream, StreamExt, TryStreamExt};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::{Error, Result};

/// The aggregate discovery selected for `requested`
pub fn selected_aggregate<'a>(
    catalog: &'a TypeCatalog,
    requested: &str,
) -> Result<&'a AggregateType> {
    catalog
        .selected_aggregate
        .as_ref()
        .filter(|a| a.name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| Error::AggregateNotFound(requested.to_string()))
}

/// Every entity of `aggregate` with its event count, in first-seen order
pub async fn entity_usage(
    store: &dyn EventStore,
    aggregate: &AggregateType,
) -> Result<Vec<EntityUsage>> {
    let mut records = store
        .find(&RecordQuery::entities_for_aggregate(aggregate.id))
        .await?;
    let mut entities = EntityAccumulator::new(&aggregate.name);
    let mut folded = 0u64;
    while let Some(record) = records.try_next().await? {
        entities.push(&record);
        folded += 1;
    }
    let entities = entities.finish();
    debug!(
        aggregate = %aggregate.name,
        records = folded,
        entities = entities.len(),
        "Enumerated entities"
    );
    Ok(entities)
}

/// Resolve an entity id or id prefix among the entities of `aggregate`
pub fn resolve_entity<'a>(
    entities: &'a [EntityUsage],
    aggregate: &AggregateType,
    entity: &str,
) -> Result<&'a EntityUsage> {
    match find_entity(entities, entity) {
        EntityLookup::Found(found) => Ok(found),
        EntityLookup::NotFound => Err(Error::EntityNotFound {
            aggregate: aggregate.name.clone(),
            entity: entity.to_string(),
        }),
        EntityLookup::Ambiguous(candidates) => Err(Error::AmbiguousEntity {
            entity: entity.to_string(),
            candidates: candidates.iter().map(|e| e.entity_id.clone()).collect(),
        }),
    }
}

/// Ordered event history of one entity
pub async fn entity_history(
    store: &dyn EventStore,
    catalog: &TypeCatalog,
    aggregate: &AggregateType,
    entity: &str,
    matching: IdMatching,
) -> Result<Vec<EventHistoryEntry>> {
    let entities = entity_usage(store, aggregate).await?;
    let resolved = resolve_entity(&entities, aggregate, entity)?;

    let records: Vec<EventRecord> = store
        .find(&RecordQuery::history_for_entity(aggregate.id, &resolved.entity_id))
        .await?
        .try_collect()
        .await?;
    Ok(build_history(&aggregate.name, catalog, matching, &records))
}

/// Entry number `index` (0-based) of a history
pub fn history_entry(history: Vec<EventHistoryEntry>, index: usize) -> Result<EventHistoryEntry> {
    let count = history.len();
    history
        .into_iter()
        .nth(index)
        .ok_or(Error::EventIndexOutOfRange { index, count })
}

/// Usage of the event type named `name` across all aggregates.
///
/// `Ok(None)` means the event type exists but was never applied.
pub async fn event_usage(
    store: &dyn EventStore,
    catalog: &TypeCatalog,
    name: &str,
) -> Result<Option<EventUsageReport>> {
    let event_type = catalog
        .find_event(name)
        .ok_or_else(|| Error::EventTypeNotFound(name.to_string()))?;
    let mut records = store
        .find(&RecordQuery::event_type_usage(&event_type.id))
        .await?;
    let mut usage = EventUsageAccumulator::new(event_type.clone(), &catalog.aggregates);
    while let Some(record) = records.try_next().await? {
        usage.push(&record);
    }
    Ok(usage.finish())
}

/// Forward every live record that is an event of `aggregate` to `on_fired`.
///
/// Runs until the record stream ends or fails. Returns the number of events forwarded.
pub async fn forward_fired_events<S, F>(
    records: S,
    catalog: &TypeCatalog,
    aggregate: &AggregateType,
    event_store: &str,
    mut on_fired: F,
) -> Result<u64>
where
    S: Stream<Item = elog_store::Result<EventRecord>>,
    F: FnMut(EventFired),
{
    let mut records = std::pin::pin!(records);
    let mut forwarded = 0;
    while let Some(record) = records.next().await {
        let record = record?;
        match match_fired_event(aggregate, catalog, &record, event_store, Utc::now()) {
            Some(fired) => {
                forwarded += 1;
                on_fired(fired);
            }
            None => debug!(offset = record.offset, "Ignoring inserted record"),
        }
    }
    Ok(forwarded)
}

/// Forward live events until `cancel` fires or the stream ends.
///
/// Cancellation is a normal stop: the number of events forwarded so far is returned.
pub async fn watch_fired_events<S, F>(
    cancel: &CancelToken,
    records: S,
    catalog: &TypeCatalog,
    aggregate: &AggregateType,
    event_store: &str,
    mut on_fired: F,
) -> Result<u64>
where
    S: Stream<Item = elog_store::Result<EventRecord>>,
    F: FnMut(EventFired),
{
    let mut forwarded = 0;
    let result = cancel
        .run(forward_fired_events(records, catalog, aggregate, event_store, |fired| {
            forwarded += 1;
            on_fired(fired);
        }))
        .await;
    match result {
        Ok(_) => Ok(forwarded),
        Err(Error::Cancelled) => {
            debug!(forwarded, "Watch stopped");
            Ok(forwarded)
        }
        Err(err) => Err(err),
    }
}
