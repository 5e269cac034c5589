//! Filters over the event log.
//!
//! Every query only selects records committed by an aggregate. Identifier values are taken
//! verbatim: anything that is not a UUID is compared as a plain string and will not match a
//! well-formed record.

use elog_types::EventRecord;
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{Binary, Bson, Document, doc};
use uuid::Uuid;

pub const FIELD_OFFSET: &str = "_id";
pub const FIELD_APPLIED_BY_AGGREGATE: &str = "Aggregate.WasAppliedByAggregate";
pub const FIELD_AGGREGATE_TYPE: &str = "Aggregate.TypeId";
pub const FIELD_EVENT_SOURCE: &str = "Metadata.EventSource";
pub const FIELD_EVENT_TYPE: &str = "Metadata.TypeId";

/// An identifier to filter on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Uuid(Uuid),
    /// Not a UUID; kept as given
    Raw(String),
}

impl FilterValue {
    pub fn parse(value: &str) -> Self {
        match Uuid::parse_str(value.trim()) {
            Ok(id) => FilterValue::Uuid(id),
            Err(_) => FilterValue::Raw(value.to_string()),
        }
    }

    fn to_bson(&self) -> Bson {
        match self {
            FilterValue::Uuid(id) => uuid_bson(id),
            FilterValue::Raw(raw) => Bson::String(raw.clone()),
        }
    }

    /// Entity ids may be stored as binary UUIDs or as strings in either case
    fn to_entity_bson(&self) -> Bson {
        match self {
            FilterValue::Uuid(id) => {
                let text = id.to_string();
                let upper = text.to_ascii_uppercase();
                doc! { "$in": [uuid_bson(id), text, upper] }.into()
            }
            FilterValue::Raw(raw) => Bson::String(raw.clone()),
        }
    }

    fn matches_uuid(&self, stored: &Uuid) -> bool {
        matches!(self, FilterValue::Uuid(id) if id == stored)
    }

    fn matches_str(&self, stored: &str) -> bool {
        match self {
            FilterValue::Uuid(id) => Uuid::parse_str(stored).is_ok_and(|s| s == *id),
            FilterValue::Raw(raw) => raw == stored,
        }
    }
}

pub(crate) fn uuid_bson(id: &Uuid) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.as_bytes().to_vec(),
    })
}

/// One event log query, translatable to a store filter or evaluated in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    aggregate: Option<Uuid>,
    entity: Option<FilterValue>,
    event_type: Option<FilterValue>,
    ordered: bool,
}

impl RecordQuery {
    /// All records committed by aggregates of type `aggregate`
    pub fn entities_for_aggregate(aggregate: Uuid) -> Self {
        Self {
            aggregate: Some(aggregate),
            entity: None,
            event_type: None,
            ordered: false,
        }
    }

    /// Records of one entity, in offset order
    pub fn history_for_entity(aggregate: Uuid, entity_id: &str) -> Self {
        Self {
            aggregate: Some(aggregate),
            entity: Some(FilterValue::parse(entity_id)),
            event_type: None,
            ordered: true,
        }
    }

    /// Records of one event type across all aggregates, in offset order
    pub fn event_type_usage(event_type_id: &str) -> Self {
        Self {
            aggregate: None,
            entity: None,
            event_type: Some(FilterValue::parse(event_type_id)),
            ordered: true,
        }
    }

    pub fn to_document(&self) -> Document {
        let mut filter = doc! { FIELD_APPLIED_BY_AGGREGATE: true };
        if let Some(aggregate) = &self.aggregate {
            filter.insert(FIELD_AGGREGATE_TYPE, uuid_bson(aggregate));
        }
        if let Some(entity) = &self.entity {
            filter.insert(FIELD_EVENT_SOURCE, entity.to_entity_bson());
        }
        if let Some(event_type) = &self.event_type {
            filter.insert(FIELD_EVENT_TYPE, event_type.to_bson());
        }
        filter
    }

    pub fn sort(&self) -> Option<Document> {
        self.ordered.then(|| doc! { FIELD_OFFSET: 1 })
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Evaluate the filter against a decoded record
    pub fn matches(&self, record: &EventRecord) -> bool {
        record.applied_by_aggregate
            && self
                .aggregate
                .is_none_or(|a| a == record.aggregate_type_id)
            && self
                .entity
                .as_ref()
                .is_none_or(|e| e.matches_str(&record.entity_id))
            && self
                .event_type
                .as_ref()
                .is_none_or(|t| t.matches_uuid(&record.event_type_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elog_testing::RecordBuilder;
    use elog_testing::records::{product_aggregate_id, product_created_id};

    #[test]
    fn entities_query_filters_on_aggregate_and_applied_flag() {
        let query = RecordQuery::entities_for_aggregate(product_aggregate_id());
        let filter = query.to_document();

        assert!(filter.get_bool(FIELD_APPLIED_BY_AGGREGATE).unwrap());
        assert_eq!(
            filter.get(FIELD_AGGREGATE_TYPE),
            Some(&uuid_bson(&product_aggregate_id()))
        );
        assert!(filter.get(FIELD_EVENT_SOURCE).is_none());
        assert_eq!(query.sort(), None);
    }

    #[test]
    fn history_query_is_ordered_by_offset() {
        let entity = Uuid::from_u128(42);
        let query = RecordQuery::history_for_entity(product_aggregate_id(), &entity.to_string());

        assert_eq!(query.sort(), Some(doc! { "_id": 1 }));
        let filter = query.to_document();
        assert_eq!(
            filter.get_document(FIELD_EVENT_SOURCE).unwrap(),
            &doc! { "$in": [
                uuid_bson(&entity),
                entity.to_string(),
                entity.to_string().to_uppercase(),
            ] }
        );
    }

    #[test]
    fn malformed_identifiers_are_used_verbatim() {
        let query = RecordQuery::event_type_usage("not-a-uuid");
        assert_eq!(
            query.to_document().get_str(FIELD_EVENT_TYPE).unwrap(),
            "not-a-uuid"
        );

        let record = RecordBuilder::new(1, "x", product_aggregate_id(), product_created_id()).build();
        assert!(!query.matches(&record));
    }

    #[test]
    fn in_memory_match_requires_applied_by_aggregate() {
        let query = RecordQuery::entities_for_aggregate(product_aggregate_id());
        let applied = RecordBuilder::new(1, "x", product_aggregate_id(), product_created_id()).build();
        let external = RecordBuilder::new(2, "x", product_aggregate_id(), product_created_id())
            .not_applied()
            .build();

        assert!(query.matches(&applied));
        assert!(!query.matches(&external));
    }

    #[test]
    fn entity_match_ignores_uuid_case() {
        let entity = Uuid::from_u128(7);
        let query = RecordQuery::history_for_entity(
            product_aggregate_id(),
            &entity.to_string().to_uppercase(),
        );
        let record =
            RecordBuilder::new(1, &entity.to_string(), product_aggregate_id(), product_created_id())
                .build();

        assert!(query.matches(&record));
    }
}
