//! Error types for Pathman
//!
//! This module defines the error taxonomy shared by the path handle, the
//! storage adapters and the copy engine.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Pathman operations
#[derive(Error, Debug)]
pub enum PathmanError {
    /// The path resolves to a backend that has no adapter configured
    #[error("Unsupported path type for '{path}': {reason}")]
    UnsupportedPathType { path: String, reason: String },

    /// The (source, destination) backend pair or the source shape is not supported
    #[error("Unsupported copy operation: {0}")]
    UnsupportedCopyOperation(String),

    /// A single object transfer failed
    #[error("Transfer of '{source_id}' to '{destination_id}' failed: {source}")]
    TransferFailure {
        source_id: String,
        destination_id: String,
        #[source]
        source: Box<PathmanError>,
    },

    /// Error reported by a storage adapter, passed through unchanged
    #[error("Backend error during {operation}: {message}")]
    Backend { operation: String, message: String },

    /// I/O error during local filesystem operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Object or file not found
    #[error("Path not found: {0}")]
    NotFound(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A transfer worker panicked or was aborted
    #[error("Transfer worker failed: {0}")]
    Join(String),
}

impl PathmanError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a backend passthrough error
    pub fn backend(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Wrap an error as the failure of one object transfer
    pub fn transfer(
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        err: PathmanError,
    ) -> Self {
        Self::TransferFailure {
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            source: Box::new(err),
        }
    }

    /// Create an unsupported path type error
    pub fn unsupported_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedPathType {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Check if this error means the target does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            Self::TransferFailure { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Get the local path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::TransferFailure { source, .. } => source.path(),
            _ => None,
        }
    }
}

/// Result type alias for Pathman operations
pub type Result<T> = std::result::Result<T, PathmanError>;

impl From<std::io::Error> for PathmanError {
    fn from(err: std::io::Error) -> Self {
        PathmanError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for PathmanError {
    fn from(err: serde_json::Error) -> Self {
        PathmanError::ConfigError(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| PathmanError::io(path, e))
    }
}
