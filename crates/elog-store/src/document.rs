//! Mapping between event log documents and [`EventRecord`].

use chrono::{DateTime, Utc};
use elog_types::EventRecord;
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{Bson, Document};
use uuid::Uuid;

use crate::error::DecodeError;

fn missing(field: &'static str) -> DecodeError {
    DecodeError { field }
}

fn nested<'a>(doc: &'a Document, path: &'static str) -> Result<&'a Bson, DecodeError> {
    let (outer, inner) = path.split_once('.').ok_or_else(|| missing(path))?;
    doc.get_document(outer)
        .ok()
        .and_then(|d| d.get(inner))
        .ok_or_else(|| missing(path))
}

/// UUID from a binary of subtype 4, or legacy subtype 3 taken byte for byte
fn as_uuid(value: &Bson) -> Option<Uuid> {
    match value {
        Bson::Binary(bin)
            if matches!(bin.subtype, BinarySubtype::Uuid | BinarySubtype::UuidOld) =>
        {
            Uuid::from_slice(&bin.bytes).ok()
        }
        _ => None,
    }
}

fn uuid_field(doc: &Document, path: &'static str) -> Result<Uuid, DecodeError> {
    as_uuid(nested(doc, path)?).ok_or_else(|| missing(path))
}

fn bool_field(doc: &Document, path: &'static str) -> Result<bool, DecodeError> {
    nested(doc, path)?.as_bool().ok_or_else(|| missing(path))
}

/// Decode one event log document
pub fn decode_record(doc: &Document) -> Result<EventRecord, DecodeError> {
    let offset = match doc.get("_id") {
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Int32(v)) => i64::from(*v),
        _ => return Err(missing("_id")),
    };

    let entity_id = match nested(doc, "Metadata.EventSource")? {
        Bson::String(s) => s.clone(),
        other => as_uuid(other)
            .map(|id| id.to_string())
            .ok_or_else(|| missing("Metadata.EventSource"))?,
    };

    let occurred = match nested(doc, "Metadata.Occurred")? {
        Bson::DateTime(dt) => DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
            .ok_or_else(|| missing("Metadata.Occurred"))?,
        _ => return Err(missing("Metadata.Occurred")),
    };

    let content = doc
        .get("Content")
        .cloned()
        .map(Bson::into_relaxed_extjson)
        .unwrap_or(serde_json::Value::Null);

    Ok(EventRecord {
        offset,
        entity_id,
        aggregate_type_id: uuid_field(doc, "Aggregate.TypeId")?,
        applied_by_aggregate: bool_field(doc, "Aggregate.WasAppliedByAggregate")?,
        event_type_id: uuid_field(doc, "Metadata.TypeId")?,
        occurred,
        public: bool_field(doc, "Metadata.Public")?,
        content,
    })
}
