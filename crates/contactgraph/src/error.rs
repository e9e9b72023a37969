//! Error types for query compilation.
//!
//! Both compilers return [`Result<T>`]. Conversion failures are scoped to a single field and
//! are reported separately through [`ConversionError`], so callers can drop the field and
//! keep going.

use thiserror::Error;

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors surfaced by the read-path and write-path compilers.
///
/// The variants are reported unmodified to the request layer, which decides whether to fall
/// back to client-side emulation.
#[derive(Error, Debug)]
pub enum CompileError {
    /// A well-formed request uses a combination the compiler does not implement
    #[error("Not supported: {message}")]
    NotSupported {
        /// What was requested
        message: String,
    },

    /// The request carries a value or argument that cannot be used
    #[error("Bad argument: {message}")]
    BadArgument {
        /// Description of the rejected argument
        message: String,
    },

    /// The static schema violates one of its own invariants
    #[error("Schema inconsistency: {message}")]
    SchemaInconsistency {
        /// Description of the defect
        message: String,
    },

    /// Cross-field inconsistency inside an entity; aborts the whole save
    #[error("Invalid detail {detail}: {message}")]
    InvalidDetail {
        /// Name of the offending detail
        detail: String,
        /// What is inconsistent
        message: String,
    },

    /// Settings could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CompileError {
    /// Create a [`CompileError::NotSupported`] error.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Create a [`CompileError::BadArgument`] error.
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument {
            message: message.into(),
        }
    }

    /// Create a [`CompileError::SchemaInconsistency`] error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaInconsistency {
            message: message.into(),
        }
    }

    /// Create a [`CompileError::InvalidDetail`] error.
    pub fn invalid_detail(detail: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDetail {
            detail: detail.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error from a message and optional source.
    pub fn config<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Whether the request layer may emulate the request client-side.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }
}

/// A value could not be converted between its native and its storage representation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot convert {value} to {target}")]
pub struct ConversionError {
    /// Debug rendering of the rejected value
    pub value: String,
    /// Name of the representation that was requested
    pub target: &'static str,
}

impl ConversionError {
    /// Create a conversion error for `value`.
    pub fn new(value: impl std::fmt::Debug, target: &'static str) -> Self {
        Self {
            value: format!("{value:?}"),
            target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_supported_error() {
        let err = CompileError::not_supported("sorting by subtypes");
        assert_eq!(err.to_string(), "Not supported: sorting by subtypes");
        assert!(err.is_not_supported());
    }

    #[test]
    fn test_invalid_detail_error() {
        let err = CompileError::invalid_detail("Avatar", "linked detail not found");
        assert_eq!(
            err.to_string(),
            "Invalid detail Avatar: linked detail not found"
        );
        assert!(!err.is_not_supported());
    }

    #[test]
    fn test_config_error() {
        let err = CompileError::config("missing file", None::<std::io::Error>);
        assert_eq!(err.to_string(), "Configuration error: missing file");
    }

    #[test]
    fn test_conversion_error() {
        let err = ConversionError::new("abc", "double");
        assert_eq!(err.to_string(), "Cannot convert \"abc\" to double");
    }
}
