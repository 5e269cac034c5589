//! Plain-text rendering of pipeline results. JSON output serializes the same values directly.

use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use elog_runtime::{Config, Profile};
use elog_types::{
    AggregateType, EntityUsage, EventFired, EventHistoryEntry, EventKind, EventType,
    EventUsageReport,
};

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn aggregates(aggregates: &[AggregateType]) -> String {
    if aggregates.is_empty() {
        return "No aggregates found\n".to_string();
    }
    let mut out = format!("Found {} aggregates:\n", aggregates.len());
    for aggregate in aggregates {
        let _ = writeln!(out, "  {}  {}", aggregate.name, aggregate.id);
    }
    out
}

pub fn event_types(events: &[EventType]) -> String {
    if events.is_empty() {
        return "No event types found\n".to_string();
    }
    let mut out = format!("Found {} event types:\n", events.len());
    for event in events {
        let _ = write!(out, "  {}  {}", event.name, event.id);
        if event.kind == EventKind::Projection {
            out.push_str("  (projection)");
        }
        out.push('\n');
    }
    out
}

pub fn entities(aggregate: &str, entities: &[EntityUsage]) -> String {
    if entities.is_empty() {
        return format!("No events found for aggregate {}\n", aggregate);
    }
    let mut out = format!("Found {} {} entities:\n", entities.len(), aggregate);
    for entity in entities {
        let _ = writeln!(
            out,
            "  {}  events: {}  offsets: {}-{}  last: {}",
            entity.entity_id,
            entity.event_count,
            entity.first_offset,
            entity.last_offset,
            timestamp(&entity.last_occurred)
        );
    }
    out
}

pub fn history(entity: &str, history: &[EventHistoryEntry]) -> String {
    if history.is_empty() {
        return format!("No events found for entity {}\n", entity);
    }
    let mut out = format!("{} events for entity {}:\n", history.len(), entity);
    for (number, entry) in history.iter().enumerate() {
        let _ = write!(
            out,
            "  #{:<3} offset {}  {}  {}",
            number,
            entry.offset,
            timestamp(&entry.occurred),
            entry.display_name()
        );
        if entry.public {
            out.push_str("  (public)");
        }
        out.push('\n');
    }
    out
}

pub fn history_entry(entry: &EventHistoryEntry) -> String {
    let payload =
        serde_json::to_string_pretty(&entry.payload).unwrap_or_else(|_| entry.payload.to_string());
    format!(
        "Event:     {}\nType id:   {}\nAggregate: {}\nOffset:    {}\nOccurred:  {}\nPublic:    {}\n{}\n",
        entry.display_name(),
        entry.event_type_id,
        entry.aggregate_name,
        entry.offset,
        timestamp(&entry.occurred),
        entry.public,
        payload
    )
}

pub fn event_usage(name: &str, report: Option<&EventUsageReport>) -> String {
    let Some(report) = report else {
        return format!("No invocations of {} were found in the event log\n", name);
    };
    let mut out = format!(
        "Event type:  {}\nType id:     {}\nInvocations: {}\nOffsets:     {}-{}\n",
        report.event_type.name,
        report.event_type.id,
        report.invocation_count,
        report.first_offset,
        report.last_offset
    );
    for usage in report.aggregates_by_usage() {
        let _ = writeln!(
            out,
            "  {}  {}  {}",
            usage.aggregate.name, usage.aggregate.id, usage.invocation_count
        );
    }
    out
}

pub fn fired(event: &EventFired) -> String {
    format!(
        "{}  offset {}  {}.{}  ({})",
        timestamp(&event.occurred),
        event.offset,
        event.aggregate_name,
        event.event_name,
        event.event_store
    )
}

pub fn config(path: &Path, config: &Config) -> String {
    let mut out = format!("Configuration: {}\n", path.display());
    if config.profiles.is_empty() {
        out.push_str("No profiles configured. Run 'elog config init' to create one.\n");
        return out;
    }
    for (name, profile) in &config.profiles {
        let marker = if config.default_profile.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };
        let _ = writeln!(out, "\n[{}]{}", name, marker);
        out.push_str(&self::profile(profile));
    }
    out
}

pub fn profile(profile: &Profile) -> String {
    format!(
        "  binaries:    {}\n  store:       {}:{}/{} ({})\n  id matching: {}\n",
        profile.binaries_path.display(),
        profile.store.server,
        profile.store.port,
        profile.store.database,
        profile.store.collection,
        profile.id_matching
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use elog_testing::records::{epoch, product_aggregate_id};
    use elog_types::AggregateUsage;
    use serde_json::json;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn product() -> AggregateType {
        AggregateType::new(product_aggregate_id(), "Product")
    }

    #[test]
    fn renders_entities() {
        let entities = vec![
            EntityUsage {
                aggregate_name: "Product".to_string(),
                entity_id: "x".to_string(),
                event_count: 3,
                first_offset: 1,
                last_offset: 5,
                last_occurred: epoch(),
            },
            EntityUsage {
                aggregate_name: "Product".to_string(),
                entity_id: "y".to_string(),
                event_count: 2,
                first_offset: 2,
                last_offset: 4,
                last_occurred: epoch(),
            },
        ];
        insta::assert_snapshot!(super::entities("Product", &entities), @r"
        Found 2 Product entities:
          x  events: 3  offsets: 1-5  last: 2024-03-01 12:00:00
          y  events: 2  offsets: 2-4  last: 2024-03-01 12:00:00
        ");
        assert_eq!(
            super::entities("Product", &[]),
            "No events found for aggregate Product\n"
        );
    }

    #[test]
    fn renders_history_with_unknown_events() {
        let entries = vec![
            EventHistoryEntry {
                offset: 1,
                aggregate_name: "Product".to_string(),
                event_type_id: Uuid::nil(),
                event_name: Some("ProductCreated".to_string()),
                occurred: epoch(),
                public: false,
                payload: json!({}),
            },
            EventHistoryEntry {
                offset: 3,
                aggregate_name: "Product".to_string(),
                event_type_id: Uuid::nil(),
                event_name: None,
                occurred: epoch(),
                public: true,
                payload: json!({}),
            },
        ];
        let text = history("x", &entries);
        assert!(text.starts_with("2 events for entity x:\n"));
        assert!(text.contains("#0   offset 1  2024-03-01 12:00:00  ProductCreated\n"));
        let unknown = format!("offset 3  2024-03-01 12:00:00  {}", Uuid::nil());
        assert!(text.contains(&unknown));
        assert!(text.trim_end().ends_with("(public)"));
    }

    #[test]
    fn renders_event_usage() {
        let mut per_aggregate = BTreeMap::new();
        per_aggregate.insert(
            product().id,
            AggregateUsage {
                aggregate: product(),
                invocation_count: 2,
            },
        );
        let report = EventUsageReport {
            event_type: EventType::event("e1", "ProductCreated"),
            invocation_count: 2,
            first_offset: 1,
            last_offset: 2,
            per_aggregate_usage: per_aggregate,
        };
        insta::assert_snapshot!(event_usage("ProductCreated", Some(&report)), @r"
        Event type:  ProductCreated
        Type id:     e1
        Invocations: 2
        Offsets:     1-2
          Product  9c5b4e1a-7d2f-4c3b-8a6e-1f0d2c3b4a59  2
        ");
        assert_eq!(
            event_usage("ProductCreated", None),
            "No invocations of ProductCreated were found in the event log\n"
        );
    }

    #[test]
    fn marks_projections() {
        let text = event_types(&[
            EventType::event("e1", "ProductCreated"),
            EventType::projection("p1", "ProductView"),
        ]);
        insta::assert_snapshot!(text, @r"
        Found 2 event types:
          ProductCreated  e1
          ProductView  p1  (projection)
        ");
    }

    #[test]
    fn renders_fired_event() {
        let event = EventFired {
            offset: 42,
            aggregate_name: "Product".to_string(),
            event_name: "ProductRenamed".to_string(),
            occurred: epoch(),
            detected: epoch(),
            event_store: "shop".to_string(),
        };
        assert_eq!(
            fired(&event),
            "2024-03-01 12:00:00  offset 42  Product.ProductRenamed  (shop)"
        );
    }
}
