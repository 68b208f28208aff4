use std::fmt;
use std::io;
use std::path::PathBuf;

/// Unified error type for the table engine.
///
/// "Nothing matched" is never an error: finds return empty sequences and
/// deletes return zero.
#[derive(Debug)]
pub enum Error {
    /// Mutating call on a table the engine only grants read access to.
    PermissionDenied { table: String, operation: &'static str },
    /// Parameter could belong to more than one bucket.
    AmbiguousParameter(String),
    /// Unparseable parameter name, bad table/column name, or wrong arity.
    MalformedRequest(String),
    /// Snapshot write or rename failed. In-memory state is ahead of disk.
    Persistence { path: PathBuf, source: io::Error },
    /// IO error outside the snapshot write path.
    Io(io::Error),
    /// Snapshot on disk does not decode to a valid table.
    Corruption(String),
    /// Table (or snapshot) does not exist.
    NotFound(String),
    /// Options file could not be parsed.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PermissionDenied { table, operation } => {
                write!(f, "Permission denied: {operation} on table \"{table}\" is read-only")
            }
            Error::AmbiguousParameter(msg) => write!(f, "Ambiguous parameter: {msg}"),
            Error::MalformedRequest(msg) => write!(f, "Malformed request: {msg}"),
            Error::Persistence { path, source } => {
                write!(f, "Persistence failure writing {}: {source}", path.display())
            }
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Corruption(msg) => write!(f, "Corruption: {msg}"),
            Error::NotFound(what) => write!(f, "Not found: {what}"),
            Error::Config(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Persistence { source, .. } => Some(source),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Corruption(e.to_string())
    }
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
