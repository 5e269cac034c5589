use async_trait::async_trait;
use elog_types::EventRecord;
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::query::RecordQuery;
use crate::reader::{EventStore, RecordStream};

/// Event log held in memory, evaluated with [`RecordQuery::matches`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    name: String,
    records: Vec<EventRecord>,
}

impl InMemoryEventStore {
    pub fn new(name: impl Into<String>, records: Vec<EventRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn push(&mut self, record: EventRecord) {
        self.records.push(record);
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, query: &RecordQuery) -> Result<RecordStream> {
        let mut found: Vec<EventRecord> = self
            .records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        if query.is_ordered() {
            found.sort_by_key(|r| r.offset);
        }
        Ok(stream::iter(found.into_iter().map(Ok)).boxed())
    }
}
