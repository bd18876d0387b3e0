//! Error types for the virtual file system

use std::fmt;

/// Virtual file system error types
#[derive(Debug, Clone, PartialEq)]
pub enum VfsError {
    /// Malformed or empty virtual path
    InvalidPath(String),
    /// Mount, file, directory, or provider absent
    NotFound(String),
    /// Operation not supported by the provider (e.g. write to an archive)
    Unsupported(String),
    /// Underlying physical read/write/enumeration failure
    Io(String),
    /// Malformed archive container metadata
    CorruptContainer(String),
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::InvalidPath(msg) => write!(f, "invalid path: {}", msg),
            VfsError::NotFound(msg) => write!(f, "not found: {}", msg),
            VfsError::Unsupported(msg) => write!(f, "unsupported operation: {}", msg),
            VfsError::Io(msg) => write!(f, "I/O error: {}", msg),
            VfsError::CorruptContainer(msg) => write!(f, "corrupt container: {}", msg),
        }
    }
}

impl std::error::Error for VfsError {}

impl From<std::io::Error> for VfsError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound(e.to_string()),
            _ => VfsError::Io(e.to_string()),
        }
    }
}
