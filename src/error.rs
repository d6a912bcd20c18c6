//! Unified error hierarchy for LiftRS
//!
//! Analysis and state transitions never fail: they degrade to neutral results
//! or no-ops. Errors only arise at the edges (persistence, configuration,
//! input validation) and are carried by the types below.

use thiserror::Error;

/// Top-level error type for all LiftRS operations
#[derive(Debug, Error)]
pub enum LiftRsError {
    /// Key-value persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// JSON (de)serialization of persisted state
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Key-value boundary errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backing store could not be opened
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    /// Read failed
    #[error("Read failed for key {key}: {reason}")]
    ReadFailed { key: String, reason: String },

    /// Write failed
    #[error("Write failed for key {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    /// Remove failed
    #[error("Remove failed for key {key}: {reason}")]
    RemoveFailed { key: String, reason: String },

    /// SQLite driver error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for LiftRS operations
pub type Result<T> = std::result::Result<T, LiftRsError>;

impl LiftRsError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LiftRsError::Storage(StorageError::Unavailable { .. })
                | LiftRsError::Storage(StorageError::WriteFailed { .. })
                | LiftRsError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LiftRsError::Storage(_) => ErrorSeverity::Warning,
            LiftRsError::Serialization(_) => ErrorSeverity::Warning,
            LiftRsError::Validation(_) => ErrorSeverity::Warning,
            LiftRsError::Configuration(_) => ErrorSeverity::Error,
            LiftRsError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            LiftRsError::Storage(StorageError::Unavailable { .. }) => {
                "Unable to open the training database. Changes are kept for this session only."
                    .to_string()
            }
            LiftRsError::Storage(_) => {
                "Saving training data failed. Changes are kept for this session only.".to_string()
            }
            LiftRsError::Validation(reason) => format!("Invalid input: {}", reason),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = LiftRsError::Storage(StorageError::WriteFailed {
            key: "mesocycles".to_string(),
            reason: "disk full".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = LiftRsError::Internal("test".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_error_retryable() {
        let err = LiftRsError::Storage(StorageError::Unavailable {
            reason: "locked".to_string(),
        });
        assert!(err.is_retryable());

        let err = LiftRsError::Validation("pump rating".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = LiftRsError::Storage(StorageError::RemoveFailed {
            key: "deload_overlay".to_string(),
            reason: "io".to_string(),
        });
        assert!(err.user_message().contains("kept for this session"));

        let err = LiftRsError::Validation("pump rating 3 out of range".to_string());
        assert!(err.user_message().starts_with("Invalid input"));
    }
}
