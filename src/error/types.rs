//! Custom error types with exit codes

use thiserror::Error;

/// Result alias used by the conversion engine
pub type Result<T, E = ConfigError> = core::result::Result<T, E>;

/// Main error type for clusterconf operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// Configuration Error - bad value, undeclared key, missing section
    #[error("{message}")]
    Configuration { message: String },

    /// Validation Error - a validator reported errors in fail-fast mode
    #[error("{message}")]
    Validation { message: String },

    /// Lookup Error - an injected lookup could not answer
    #[error("Lookup error: {message}")]
    Lookup { message: String },

    /// Filesystem Error - reading or writing a document failed
    #[error("Filesystem error: {message}")]
    Filesystem { message: String },
}

impl ConfigError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Configuration { .. } => 1,
            Self::Validation { .. } => 2,
            Self::Lookup { .. } => 3,
            Self::Filesystem { .. } => 4,
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error
    #[inline]
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a lookup error
    #[inline]
    pub fn lookup<S: Into<String>>(message: S) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }

    /// Create a filesystem error
    #[inline]
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }
}
