//! Read-only access to CLI assembly metadata.
//!
//! Nothing here executes or maps code: a binary is read into memory once, the PE container is
//! walked to the metadata root, and tables are decoded on demand.

mod bytes;
pub(crate) mod image;
pub(crate) mod pe;
pub(crate) mod signature;
pub(crate) mod tables;

pub use signature::{MarkerArg, ParamType};
