use async_trait::async_trait;
use elog_types::EventRecord;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::query::RecordQuery;

/// Matching records as they are read. Ordered by offset when the query asks for it.
pub type RecordStream = BoxStream<'static, Result<EventRecord>>;

/// Read access to an event log.
///
/// Implementations stream every matching record; an empty stream is not an error.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Name of the event store, used when reporting live events
    fn name(&self) -> &str;

    async fn find(&self, query: &RecordQuery) -> Result<RecordStream>;
}
