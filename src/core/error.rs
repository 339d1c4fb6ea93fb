//! Unified error handling for prokit
//!
//! Every fallible helper in the crate reports through [`ProKitError`]. The HTTP
//! orchestrator is the exception: it folds failures into an envelope instead.

use std::fmt;

/// Unified error types for the utility helpers
#[derive(Debug)]
pub enum ProKitError {
    /// Configuration-related errors
    Configuration(String),

    /// File system and I/O errors
    Io(std::io::Error),

    /// JSON / YAML (de)serialization errors
    Serialization(String),

    /// Validation errors
    Validation(String),

    /// Transport construction errors
    Transport(String),

    /// Encryption / decryption errors
    Cipher(String),

    /// Storage backend errors
    Storage(String),

    /// Text encoding and decoding errors (base64, utf-8, data urls)
    Encoding(String),

    /// Internal errors
    Internal(String),
}

impl ProKitError {
    pub fn serialization_error(context: &str, err: impl fmt::Display) -> Self {
        ProKitError::Serialization(format!("{context}: {err}"))
    }

    pub fn encoding_error(context: &str, err: impl fmt::Display) -> Self {
        ProKitError::Encoding(format!("{context}: {err}"))
    }
}

impl fmt::Display for ProKitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProKitError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            ProKitError::Io(err) => write!(f, "I/O error: {err}"),
            ProKitError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            ProKitError::Validation(msg) => write!(f, "Validation error: {msg}"),
            ProKitError::Transport(msg) => write!(f, "Transport error: {msg}"),
            ProKitError::Cipher(msg) => write!(f, "Cipher error: {msg}"),
            ProKitError::Storage(msg) => write!(f, "Storage error: {msg}"),
            ProKitError::Encoding(msg) => write!(f, "Encoding error: {msg}"),
            ProKitError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ProKitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProKitError::Io(err) => Some(err),
            _ => None,
        }
    }
}

// Error conversions
impl From<std::io::Error> for ProKitError {
    fn from(err: std::io::Error) -> Self {
        ProKitError::Io(err)
    }
}

impl From<serde_json::Error> for ProKitError {
    fn from(err: serde_json::Error) -> Self {
        ProKitError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ProKitError {
    fn from(err: serde_yaml::Error) -> Self {
        ProKitError::Serialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ProKitError {
    fn from(err: validator::ValidationErrors) -> Self {
        ProKitError::Validation(err.to_string())
    }
}

impl From<base64::DecodeError> for ProKitError {
    fn from(err: base64::DecodeError) -> Self {
        ProKitError::Encoding(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for ProKitError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ProKitError::Encoding(err.to_string())
    }
}

/// Result type alias for helper operations
pub type ProKitResult<T> = std::result::Result<T, ProKitError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> ProKitResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> ProKitResult<T> {
        self.map_err(|e| ProKitError::Internal(format!("{context}: {e}")))
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::ProKitError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::ProKitError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::core::ProKitError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::ProKitError::Internal(format!($fmt, $($arg)*))
    };
}
