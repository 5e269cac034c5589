use std::fmt;

/// Result type for elog-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the types layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unknown identifier matching policy name
    UnknownMatching(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownMatching(name) => write!(
                f,
                "Unknown id matching policy '{}' (expected 'exact' or 'contains')",
                name
            ),
        }
    }
}

impl std::error::Error for Error {}
