use std::path::{Path, PathBuf};

/// Name-prefix blocklist for third-party and runtime binaries.
///
/// Matching is on the file name only, ignoring ASCII case. An empty blocklist keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryFilter {
    prefixes: Vec<String>,
}

impl BinaryFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn is_blocked(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Keep the paths that are not blocked, preserving order
    pub fn apply(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths.into_iter().filter(|p| !self.is_blocked(p)).collect()
    }
}
