// Engine - pure folds from event log records (plus the type catalog) to usage views.
// Nothing here performs I/O; readers feed records in and callers present the results.

pub mod entities;
pub mod history;
pub mod usage;
pub mod watch;

pub use entities::{EntityAccumulator, EntityLookup, enumerate_entities, find_entity};
pub use history::build_history;
pub use usage::{EventUsageAccumulator, summarize_event_usage};
pub use watch::match_fired_event;
