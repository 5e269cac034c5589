//! Testing infrastructure for elog.
//!
//! - `assembly`: writer for minimal CLI assemblies
//! - `fixtures`: assemblies following the aggregate/event/projection conventions
//! - `world`: temporary binaries folders
//! - `records`: event log record fixtures

pub mod assembly;
pub mod fixtures;
pub mod records;
pub mod world;

pub use assembly::{AssemblyBuilder, AttributeUsage, CtorParam, TypeDefinition};
pub use records::RecordBuilder;
pub use world::BinariesFolder;
