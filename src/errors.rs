//! Error handling for the poll service

/// Result type alias for the poll service
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the poll service
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed input or a reference to something that does not exist
    #[error("{message}")]
    Validation { message: String },

    /// The write would break a uniqueness rule (duplicate vote, duplicate email)
    #[error("{message}")]
    Conflict { message: String },

    /// A looked-up resource does not exist
    #[error("{message}")]
    NotFound { message: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Socket and listener errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the caller caused this error. Client errors carry no side effects
    /// and their message is safe to show to the caller.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Conflict { .. } | Self::NotFound { .. }
        )
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::Error::validation($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::validation(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! conflict_error {
    ($msg:expr) => {
        $crate::Error::conflict($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::conflict(format!($fmt, $($arg)*))
    };
}
