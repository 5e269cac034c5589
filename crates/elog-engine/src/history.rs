use elog_types::{EventHistoryEntry, EventRecord, IdMatching, TypeCatalog};

/// Map one entity's records to history entries, keeping their order.
///
/// Event names come from the catalog; a record whose type id matches no discovered event keeps
/// `event_name: None`.
pub fn build_history<'r>(
    aggregate_name: &str,
    catalog: &TypeCatalog,
    matching: IdMatching,
    records: impl IntoIterator<Item = &'r EventRecord>,
) -> Vec<EventHistoryEntry> {
    records
        .into_iter()
        .map(|record| EventHistoryEntry {
            offset: record.offset,
            aggregate_name: aggregate_name.to_string(),
            event_type_id: record.event_type_id,
            event_name: catalog
                .resolve_event(&record.event_type_id.to_string(), matching)
                .map(|e| e.name.clone()),
            occurred: record.occurred,
            public: record.public,
            payload: record.content.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use elog_testing::records::{self, product_created_id, product_renamed_id};
    use elog_types::EventType;
    use serde_json::json;

    fn catalog() -> TypeCatalog {
        TypeCatalog {
            events: vec![EventType::event(product_created_id().to_string(), "ProductCreated")],
            ..TypeCatalog::default()
        }
    }

    #[test]
    fn resolves_names_and_keeps_order() {
        let log = records::product_log();
        let x: Vec<_> = log.iter().filter(|r| r.entity_id == "x").collect();

        let history = build_history("Product", &catalog(), IdMatching::Exact, x);

        let offsets: Vec<i64> = history.iter().map(|h| h.offset).collect();
        assert_eq!(offsets, vec![1, 3, 5]);
        assert_eq!(history[0].event_name.as_deref(), Some("ProductCreated"));
        assert_eq!(history[1].event_name, None);
        assert_eq!(history[1].display_name(), product_renamed_id().to_string());
        assert!(history[1].public);
        assert_eq!(history[2].payload, json!({ "offset": 5 }));
    }

    #[test]
    fn uppercase_declared_ids_still_resolve() {
        let catalog = TypeCatalog {
            events: vec![EventType::event(
                product_created_id().to_string().to_uppercase(),
                "ProductCreated",
            )],
            ..TypeCatalog::default()
        };
        let log = records::product_log();

        let history = build_history("Product", &catalog, IdMatching::Exact, &log[..1]);

        assert_eq!(history[0].event_name.as_deref(), Some("ProductCreated"));
    }

    #[test]
    fn legacy_contains_matching_resolves_decorated_ids() {
        // Declared ids carrying extra text only resolve under the legacy policy.
        let catalog = TypeCatalog {
            events: vec![EventType::event(
                format!("{{{}}}", product_created_id()),
                "ProductCreated",
            )],
            ..TypeCatalog::default()
        };
        let log = records::product_log();

        let exact = build_history("Product", &catalog, IdMatching::Exact, &log[..1]);
        let contains = build_history("Product", &catalog, IdMatching::Contains, &log[..1]);

        assert_eq!(exact[0].event_name, None);
        assert_eq!(contains[0].event_name.as_deref(), Some("ProductCreated"));
    }
}
