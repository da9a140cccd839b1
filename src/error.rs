//! Error types for Glass operations.

use thiserror::Error;

/// Result type alias for Glass operations.
pub type Result<T> = std::result::Result<T, GlassError>;

/// Main error type for Glass operations.
#[derive(Error, Debug)]
pub enum GlassError {
    /// Underlying key-value store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// The acting user may not perform the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Password hashing errors
    #[error("Password error: {0}")]
    Password(String),
}

impl GlassError {
    /// Creates a new storage error.
    pub fn storage<T: ToString>(msg: T) -> Self {
        Self::Storage(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new not-found error.
    pub fn not_found<T: ToString>(msg: T) -> Self {
        Self::NotFound(msg.to_string())
    }

    /// Creates a new validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Creates a new permission error.
    pub fn permission_denied<T: ToString>(msg: T) -> Self {
        Self::PermissionDenied(msg.to_string())
    }

    /// Creates a new password error.
    pub fn password<T: ToString>(msg: T) -> Self {
        Self::Password(msg.to_string())
    }

    /// Returns true for errors that mean "the thing you asked for is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
