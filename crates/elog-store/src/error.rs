use std::fmt;

/// Result type for elog-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading the event log
#[derive(Debug)]
pub enum Error {
    /// The store could not be reached within the connection timeout
    StoreUnavailable {
        address: String,
        source: mongodb::error::Error,
    },

    /// A query or change stream failed after connecting
    Database(mongodb::error::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StoreUnavailable { address, source } => {
                write!(f, "Event store at {} is unavailable: {}", address, source)
            }
            Error::Database(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StoreUnavailable { source, .. } => Some(source),
            Error::Database(err) => Some(err),
        }
    }
}

impl From<mongodb::error::Error> for Error {
    fn from(err: mongodb::error::Error) -> Self {
        Error::Database(err)
    }
}

/// A stored document does not have the event log shape. The record is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub field: &'static str,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing or invalid field '{}'", self.field)
    }
}

impl std::error::Error for DecodeError {}
