//! Common error types for storage providers.

use thiserror::Error;

/// Top-level error type for provider operations.
///
/// Every backend reports through this enum so callers can branch on the
/// variant instead of on message text.
#[derive(Debug, Error)]
pub enum Error {
    /// Data operation attempted before a successful `initialize()`.
    #[error("Provider not ready: {0}")]
    NotReady(String),

    /// Backend unreachable or credentials rejected.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Key or container absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Read failed mid-operation.
    #[error("Read error: {0}")]
    Read(String),

    /// Write failed mid-operation.
    #[error("Write error: {0}")]
    Write(String),

    /// Operation has no mapping on this backend.
    #[error("Operation '{operation}' is not supported by the {backend} backend")]
    Unsupported {
        /// Backend name, e.g. "s3".
        backend: String,
        /// Operation name, e.g. "create_container".
        operation: &'static str,
    },

    /// Options missing a required field or holding an invalid value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an `Unsupported` error for a backend/operation pair.
    pub fn unsupported(backend: impl Into<String>, operation: &'static str) -> Self {
        Self::Unsupported {
            backend: backend.into(),
            operation,
        }
    }

    /// Whether this error signals a capability gap rather than a failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Whether this error means the key or container does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_is_distinguishable() {
        let err = Error::unsupported("s3", "create_container");
        assert!(err.is_unsupported());
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Operation 'create_container' is not supported by the s3 backend"
        );
    }

    #[test]
    fn test_io_not_found_counts_as_not_found() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.is_not_found());

        let err: Error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no").into();
        assert!(!err.is_not_found());
    }
}
