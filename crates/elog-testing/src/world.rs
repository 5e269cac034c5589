//! Isolated binaries folders for discovery tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::assembly::AssemblyBuilder;
use crate::fixtures;

/// A temporary folder of binaries, removed on drop.
///
/// # Example
/// ```no_run
/// use elog_testing::{BinariesFolder, fixtures};
///
/// let folder = BinariesFolder::new()
///     .with_root_binary()
///     .with_assembly("Acme.Domain.dll", fixtures::product_assembly());
/// assert!(folder.file("Acme.Domain.dll").exists());
/// ```
pub struct BinariesFolder {
    temp_dir: TempDir,
}

impl Default for BinariesFolder {
    fn default() -> Self {
        Self::new()
    }
}

impl BinariesFolder {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Add the binary defining the aggregate root base type and the standard markers
    pub fn with_root_binary(self) -> Self {
        self.with_assembly(fixtures::ROOT_BINARY, fixtures::root_assembly())
    }

    pub fn with_assembly(self, file_name: &str, assembly: AssemblyBuilder) -> Self {
        self.with_raw_file(file_name, &assembly.build())
    }

    /// Write arbitrary bytes, for broken or non-assembly files
    pub fn with_raw_file(self, file_name: &str, bytes: &[u8]) -> Self {
        std::fs::write(self.file(file_name), bytes).expect("Failed to write binary");
        self
    }

    pub fn remove(&self, file_name: &str) {
        std::fs::remove_file(self.file(file_name)).expect("Failed to remove binary");
    }
}
