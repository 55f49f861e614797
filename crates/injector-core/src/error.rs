//! Error types for the injection configuration store.
//!
//! Every fallible operation in this crate returns [`InjectorError`]. Lookups of
//! packages that were never configured are not errors; they resolve to the
//! documented defaults instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the injector store.
#[derive(Debug, Error)]
pub enum InjectorError {
    // Storage errors
    #[error("Storage error at {path:?}: {message}")]
    Storage {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Registry errors
    #[error("Library not registered: {stored_path}")]
    LibraryNotFound { stored_path: String },

    #[error("Library import from {source_path:?} failed: {message}")]
    ImportFailed {
        source_path: PathBuf,
        message: String,
    },

    // Concurrency errors
    #[error("Configuration cache lock poisoned by a panicked writer")]
    LockPoisoned,
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, InjectorError>;

impl From<std::io::Error> for InjectorError {
    fn from(err: std::io::Error) -> Self {
        InjectorError::Storage {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for InjectorError {
    fn from(err: serde_json::Error) -> Self {
        InjectorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl InjectorError {
    /// Create a storage error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        InjectorError::Storage {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        InjectorError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for failures of the filesystem layer (including failed serialization on write).
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            InjectorError::Storage { .. } | InjectorError::Json { .. }
        )
    }

    /// True when the input was rejected before any mutation happened.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, InjectorError::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InjectorError::LibraryNotFound {
            stored_path: "/data/libraries/abc_libfoo.so".into(),
        };
        assert_eq!(
            err.to_string(),
            "Library not registered: /data/libraries/abc_libfoo.so"
        );

        let err = InjectorError::validation("port", "must be between 1 and 65535");
        assert_eq!(
            err.to_string(),
            "Validation error for port: must be between 1 and 65535"
        );
    }

    #[test]
    fn test_error_classification() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = InjectorError::io_with_path(io, "/readonly/config");
        assert!(err.is_storage_error());
        assert!(!err.is_validation_error());

        let err = InjectorError::validation("delay", "out of range");
        assert!(err.is_validation_error());
        assert!(!err.is_storage_error());
    }
}
