use std::fmt;

/// Result type for elog-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while running a pipeline
#[derive(Debug)]
pub enum Error {
    /// Type discovery failed
    Discovery(elog_discovery::Error),

    /// Event store access failed
    Store(elog_store::Error),

    /// No discovered aggregate has the requested name
    AggregateNotFound(String),

    /// No discovered event type has the requested name
    EventTypeNotFound(String),

    /// No entity of the aggregate matches the requested id
    EntityNotFound { aggregate: String, entity: String },

    /// The requested id prefix matches several entities
    AmbiguousEntity {
        entity: String,
        candidates: Vec<String>,
    },

    /// History entry number past the end of the history
    EventIndexOutOfRange { index: usize, count: usize },

    /// Named profile is missing from the configuration
    ProfileNotFound(String),

    /// Configuration error
    Config(String),

    /// IO operation failed
    Io(std::io::Error),

    /// Blocking discovery task failed to complete
    Join(tokio::task::JoinError),

    /// The run was cancelled
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Discovery(err) => write!(f, "Discovery error: {}", err),
            Error::Store(err) => write!(f, "Event store error: {}", err),
            Error::AggregateNotFound(name) => {
                write!(f, "Aggregate '{}' was not found in the binaries", name)
            }
            Error::EventTypeNotFound(name) => {
                write!(f, "Event type '{}' was not found in the binaries", name)
            }
            Error::EntityNotFound { aggregate, entity } => {
                write!(f, "No entity '{}' found for aggregate '{}'", entity, aggregate)
            }
            Error::AmbiguousEntity { entity, candidates } => write!(
                f,
                "Entity id '{}' is ambiguous, it matches: {}",
                entity,
                candidates.join(", ")
            ),
            Error::EventIndexOutOfRange { index, count } => write!(
                f,
                "Event number {} is out of range (history has {} events)",
                index, count
            ),
            Error::ProfileNotFound(name) => write!(f, "Profile '{}' is not configured", name),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Join(err) => write!(f, "Background task failed: {}", err),
            Error::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Discovery(err) => Some(err),
            Error::Store(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Join(err) => Some(err),
            Error::AggregateNotFound(_)
            | Error::EventTypeNotFound(_)
            | Error::EntityNotFound { .. }
            | Error::AmbiguousEntity { .. }
            | Error::EventIndexOutOfRange { .. }
            | Error::ProfileNotFound(_)
            | Error::Config(_)
            | Error::Cancelled => None,
        }
    }
}

impl From<elog_discovery::Error> for Error {
    fn from(err: elog_discovery::Error) -> Self {
        match err {
            elog_discovery::Error::Cancelled => Error::Cancelled,
            other => Error::Discovery(other),
        }
    }
}

impl From<elog_store::Error> for Error {
    fn from(err: elog_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Join(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
