//! Orchestration for elog: profiles, logging, cancellation, and the discovery and query pipeline.

// Error types
pub mod error;

// Profiles on disk
pub mod config;

// Tracing setup
pub mod logging;

// Cancellation
pub mod cancel;

// Store queries folded by the engine
pub mod pipeline;

// Facade
pub mod runtime;

pub use cancel::CancelToken;
pub use config::{Config, DiscoveryConfig, Profile, StoreConfig, resolve_config_dir};
pub use error::{Error, Result};
pub use runtime::Runtime;
