use std::fmt;
use std::path::PathBuf;

/// Result type for elog-discovery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while discovering types in a binaries folder
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),

    /// Walkdir error
    WalkDir(walkdir::Error),

    /// One binary could not be read as an assembly
    Load { path: PathBuf, source: LoadError },

    /// The aggregate root base type could not be located
    RootTypeNotFound { binary: PathBuf, type_name: String },

    /// Discovery was cancelled before it completed
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::WalkDir(err) => write!(f, "Directory traversal error: {}", err),
            Error::Load { path, source } => {
                write!(f, "Unable to load {}: {}", path.display(), source)
            }
            Error::RootTypeNotFound { binary, type_name } => write!(
                f,
                "Root type '{}' not found in {}",
                type_name,
                binary.display()
            ),
            Error::Cancelled => write!(f, "Discovery cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Load { source, .. } => Some(source),
            Error::RootTypeNotFound { .. } | Error::Cancelled => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDir(err)
    }
}

/// Failure to read one binary's metadata. Callers skip the binary.
#[derive(Debug)]
pub enum LoadError {
    /// File could not be read
    Io(std::io::Error),

    /// Not a portable executable, or one without CLI metadata
    NotAnAssembly(String),

    /// CLI metadata present but structurally invalid
    Malformed(String),
}

impl LoadError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        LoadError::Malformed(msg.into())
    }

    pub(crate) fn truncated(what: &str) -> Self {
        LoadError::Malformed(format!("truncated {}", what))
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(err) => write!(f, "IO error: {}", err),
            LoadError::NotAnAssembly(msg) => write!(f, "Not an assembly: {}", msg),
            LoadError::Malformed(msg) => write!(f, "Malformed metadata: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err),
            LoadError::NotAnAssembly(_) | LoadError::Malformed(_) => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::Io(err)
    }
}

/// A marker's constructor arguments could not be read as an identifier.
///
/// Never propagated out of classification; it only explains why a rule did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    /// Value blob does not start with the 0x0001 prolog
    BadProlog,
    /// Value blob ends before all fixed arguments are read
    Truncated,
    /// Constructor takes no arguments
    NoArguments,
    /// Argument type cannot be decoded without resolving other assemblies
    UnsupportedArgument(String),
    /// Identifier argument is not a string
    NotAString,
    /// Identifier argument is null or blank
    EmptyIdentifier,
    /// Identifier argument is not a UUID where one is required
    InvalidUuid(String),
}

impl fmt::Display for MarkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerError::BadProlog => write!(f, "custom attribute blob has no prolog"),
            MarkerError::Truncated => write!(f, "custom attribute blob is truncated"),
            MarkerError::NoArguments => write!(f, "marker has no constructor arguments"),
            MarkerError::UnsupportedArgument(kind) => {
                write!(f, "unsupported constructor argument type: {}", kind)
            }
            MarkerError::NotAString => write!(f, "identifier argument is not a string"),
            MarkerError::EmptyIdentifier => write!(f, "identifier argument is empty"),
            MarkerError::InvalidUuid(value) => write!(f, "identifier '{}' is not a UUID", value),
        }
    }
}

impl std::error::Error for MarkerError {}
