//! Execution-free discovery of aggregates, events and projections in a folder of CLI assemblies.
//!
//! Binaries are parsed as data: the PE container and ECMA-335 metadata tables are decoded
//! directly, so no code from the scanned folder is ever loaded or run.

// Error types
pub mod error;

// Metadata reader
pub mod metadata;

// Per-binary type descriptors
pub mod loader;

// Name blocklist
pub mod filter;

// Classification rules
pub mod classifier;

// Folder scan
pub mod catalog;

pub use catalog::{
    DEFAULT_EXTENSION, DEFAULT_ROOT_BINARY, DEFAULT_ROOT_TYPE, DEFAULT_SKIP_PREFIXES,
    DiscoveryOptions, TypeCatalogBuilder,
};
pub use classifier::{Ancestry, Classification, MarkerNames, TypeClassifier};
pub use error::{Error, LoadError, MarkerError, Result};
pub use filter::BinaryFilter;
pub use loader::{BinaryMetadata, Marker, TypeDescriptor, load_binary};
pub use metadata::{MarkerArg, ParamType};
