use std::path::PathBuf;

use thiserror::Error;

/// A3S Ferry error types
#[derive(Error, Debug)]
pub enum FerryError {
    /// Conflicting or missing source selectors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A service manifest could not be read or parsed
    #[error("Failed to parse {}: {message}", .path.display())]
    ParseError { path: PathBuf, message: String },

    /// Catalog lookup key is not in the fixed table
    #[error("Unsupported selector: {0}")]
    UnsupportedSelector(String),

    /// Archive directory does not exist
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Task source resolved to nothing
    #[error("No work items: {0}")]
    NoWorkItems(String),

    /// Container runtime binary missing or daemon unreachable
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// A single work item failed
    #[error("Task failed: {0}")]
    TaskFailure(String),

    /// Side-car manifest read or write failed
    #[error("Manifest error: {0}")]
    ManifestError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for FerryError {
    fn from(err: serde_json::Error) -> Self {
        FerryError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for FerryError {
    fn from(err: serde_yaml::Error) -> Self {
        FerryError::SerializationError(err.to_string())
    }
}

/// Result type alias for A3S Ferry operations
pub type Result<T> = std::result::Result<T, FerryError>;
