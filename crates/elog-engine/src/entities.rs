use std::collections::HashMap;

use elog_types::{EntityUsage, EventRecord};

/// Streaming tally of records per entity, in first-seen order
#[derive(Debug, Default)]
pub struct EntityAccumulator {
    aggregate_name: String,
    index: HashMap<String, usize>,
    entities: Vec<EntityUsage>,
}

impl EntityAccumulator {
    pub fn new(aggregate_name: impl Into<String>) -> Self {
        Self {
            aggregate_name: aggregate_name.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, record: &EventRecord) {
        match self.index.get(&record.entity_id) {
            Some(&i) => {
                let entity = &mut self.entities[i];
                entity.event_count += 1;
                entity.first_offset = entity.first_offset.min(record.offset);
                entity.last_offset = entity.last_offset.max(record.offset);
                entity.last_occurred = entity.last_occurred.max(record.occurred);
            }
            None => {
                self.index
                    .insert(record.entity_id.clone(), self.entities.len());
                self.entities.push(EntityUsage {
                    aggregate_name: self.aggregate_name.clone(),
                    entity_id: record.entity_id.clone(),
                    event_count: 1,
                    first_offset: record.offset,
                    last_offset: record.offset,
                    last_occurred: record.occurred,
                });
            }
        }
    }

    pub fn finish(self) -> Vec<EntityUsage> {
        self.entities
    }
}

/// Group records of one aggregate type by entity id
pub fn enumerate_entities<'a>(
    aggregate_name: &str,
    records: impl IntoIterator<Item = &'a EventRecord>,
) -> Vec<EntityUsage> {
    let mut acc = EntityAccumulator::new(aggregate_name);
    for record in records {
        acc.push(record);
    }
    acc.finish()
}

/// Outcome of looking an entity up by id or id prefix
#[derive(Debug, PartialEq, Eq)]
pub enum EntityLookup<'a> {
    Found(&'a EntityUsage),
    NotFound,
    Ambiguous(Vec<&'a EntityUsage>),
}

/// Resolve `needle` against enumerated entities, ignoring ASCII case.
///
/// A full id match wins; otherwise the needle must prefix exactly one id.
pub fn find_entity<'a>(entities: &'a [EntityUsage], needle: &str) -> EntityLookup<'a> {
    let needle = needle.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return EntityLookup::NotFound;
    }
    if let Some(exact) = entities
        .iter()
        .find(|e| e.entity_id.eq_ignore_ascii_case(&needle))
    {
        return EntityLookup::Found(exact);
    }
    let mut candidates: Vec<&EntityUsage> = entities
        .iter()
        .filter(|e| e.entity_id.to_ascii_lowercase().starts_with(&needle))
        .collect();
    match candidates.len() {
        0 => EntityLookup::NotFound,
        1 => EntityLookup::Found(candidates.remove(0)),
        _ => EntityLookup::Ambiguous(candidates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elog_testing::records::{self, product_aggregate_id, product_created_id};
    use elog_testing::RecordBuilder;

    #[test]
    fn counts_entities_in_first_seen_order() {
        let log = records::product_log();
        let entities = enumerate_entities("Product", &log);

        let summary: Vec<(&str, u64)> = entities
            .iter()
            .map(|e| (e.entity_id.as_str(), e.event_count))
            .collect();
        assert_eq!(summary, vec![("x", 3), ("y", 2)]);
        assert!(entities.iter().all(|e| e.aggregate_name == "Product"));
    }

    #[test]
    fn offsets_are_true_min_and_max() {
        let log = vec![
            RecordBuilder::new(8, "x", product_aggregate_id(), product_created_id()).build(),
            RecordBuilder::new(2, "x", product_aggregate_id(), product_created_id()).build(),
            RecordBuilder::new(5, "x", product_aggregate_id(), product_created_id()).build(),
        ];
        let entities = enumerate_entities("Product", &log);

        assert_eq!(entities[0].first_offset, 2);
        assert_eq!(entities[0].last_offset, 8);
        assert_eq!(entities[0].last_occurred, log[0].occurred);
    }

    #[test]
    fn no_records_no_entities() {
        assert!(enumerate_entities("Product", &[]).is_empty());
    }

    #[test]
    fn find_entity_by_prefix() {
        let log = vec![
            RecordBuilder::new(1, "a1b2", product_aggregate_id(), product_created_id()).build(),
            RecordBuilder::new(2, "a1c3", product_aggregate_id(), product_created_id()).build(),
            RecordBuilder::new(3, "f00d", product_aggregate_id(), product_created_id()).build(),
        ];
        let entities = enumerate_entities("Product", &log);

        assert!(matches!(find_entity(&entities, "F0"), EntityLookup::Found(e) if e.entity_id == "f00d"));
        assert!(matches!(find_entity(&entities, "a1"), EntityLookup::Ambiguous(v) if v.len() == 2));
        assert_eq!(find_entity(&entities, "zz"), EntityLookup::NotFound);
        assert_eq!(find_entity(&entities, "  "), EntityLookup::NotFound);
        assert!(matches!(find_entity(&entities, "A1B2"), EntityLookup::Found(e) if e.entity_id == "a1b2"));
    }
}
