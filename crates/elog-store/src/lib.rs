//! Event log access: query construction, document decoding and readers.

// Error types
pub mod error;

// Filters
pub mod query;

// Document mapping
pub mod document;

// Reader abstraction
pub mod reader;

// MongoDB-backed reader
pub mod mongo;

// In-memory reader
pub mod memory;

pub use document::decode_record;
pub use error::{DecodeError, Error, Result};
pub use memory::InMemoryEventStore;
pub use mongo::{DEFAULT_COLLECTION, DEFAULT_PORT, DEFAULT_TIMEOUT, MongoEventStore, StoreSettings};
pub use query::{FilterValue, RecordQuery};
pub use reader::{EventStore, RecordStream};
