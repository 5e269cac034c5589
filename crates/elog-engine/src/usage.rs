use std::collections::BTreeMap;

use elog_types::{
    AggregateType, AggregateUsage, EventRecord, EventType, EventUsageReport,
    UNKNOWN_AGGREGATE_NAME,
};

/// Single-pass fold of one event type's records into an [`EventUsageReport`].
///
/// Per-aggregate tallies are created on first sight; aggregates missing from `known` are
/// reported under a placeholder name.
#[derive(Debug)]
pub struct EventUsageAccumulator<'a> {
    event_type: EventType,
    known: &'a [AggregateType],
    invocation_count: u64,
    offsets: Option<(i64, i64)>,
    per_aggregate: BTreeMap<uuid::Uuid, AggregateUsage>,
}

impl<'a> EventUsageAccumulator<'a> {
    pub fn new(event_type: EventType, known: &'a [AggregateType]) -> Self {
        Self {
            event_type,
            known,
            invocation_count: 0,
            offsets: None,
            per_aggregate: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, record: &EventRecord) {
        self.invocation_count += 1;
        self.offsets = Some(match self.offsets {
            Some((first, last)) => (first.min(record.offset), last.max(record.offset)),
            None => (record.offset, record.offset),
        });

        let known = self.known;
        self.per_aggregate
            .entry(record.aggregate_type_id)
            .or_insert_with(|| {
                let aggregate = known
                    .iter()
                    .find(|a| a.id == record.aggregate_type_id)
                    .cloned()
                    .unwrap_or_else(|| {
                        AggregateType::new(record.aggregate_type_id, UNKNOWN_AGGREGATE_NAME)
                    });
                AggregateUsage {
                    aggregate,
                    invocation_count: 0,
                }
            })
            .invocation_count += 1;
    }

    /// `None` when no record was folded
    pub fn finish(self) -> Option<EventUsageReport> {
        let (first_offset, last_offset) = self.offsets?;
        Some(EventUsageReport {
            event_type: self.event_type,
            invocation_count: self.invocation_count,
            first_offset,
            last_offset,
            per_aggregate_usage: self.per_aggregate,
        })
    }
}

/// Fold records of `event_type` into a usage report
pub fn summarize_event_usage<'r>(
    event_type: &EventType,
    aggregates: &[AggregateType],
    records: impl IntoIterator<Item = &'r EventRecord>,
) -> Option<EventUsageReport> {
    let mut acc = EventUsageAccumulator::new(event_type.clone(), aggregates);
    for record in records {
        acc.push(record);
    }
    acc.finish()
}
