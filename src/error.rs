//! Error types for xsd-lookup
//!
//! All user-facing failures from the core (index, resolver, walker,
//! validator) are returned as structured results, never thrown for control
//! flow. Fatal errors are reserved for schema construction: file I/O and
//! XSD parse failures.

use std::fmt;
use thiserror::Error;

/// Result type alias using the crate's `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error type, returned only from schema construction and loading.
#[derive(Error, Debug)]
pub enum Error {
    /// XSD parsing/building error (SchemaLoadFailure, §7)
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Resource loading error (file missing, unreadable, size limit exceeded)
    #[error("resource error: {0}")]
    Resource(String),

    /// Limit exceeded error (depth/step/cache caps)
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// XSD parsing error, surfaced from `SchemaDoc::load`/`merge`.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location in the schema file, if known
    pub location: Option<String>,
    /// Schema source snippet that caused the error
    pub source: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source snippet
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, "\n\nSource:\n{}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// The structured result of validating one attribute value (§4.7).
///
/// Distinct from `Error`: this is never thrown, only returned.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Whether the value passed validation
    pub is_valid: bool,
    /// The built-in type the value was checked against, if resolvable
    pub expected_type: Option<String>,
    /// Allowed values, when the descriptor carries an enumeration
    pub allowed_values: Option<Vec<String>>,
    /// Human-readable descriptions of every restriction considered
    pub restrictions: Vec<String>,
    /// Human-readable failure summary, present iff `!is_valid`
    pub error_message: Option<String>,
}

impl ValidationOutcome {
    /// Build a passing outcome
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    /// Build a failing outcome with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// The structured result of the static, accumulating rule validator (§4.7,
/// §6 `validateAttributeValueAgainstRules`).
#[derive(Debug, Clone, Default)]
pub struct RuleViolationOutcome {
    /// Whether the value passed every applicable facet
    pub is_valid: bool,
    /// Human-readable failure summary, present iff `!is_valid`
    pub error_message: Option<String>,
    /// Every failing facet, accumulated rather than short-circuited
    pub violated_rules: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("Invalid schema syntax")
            .with_location("schema.xsd:42:10")
            .with_source("<xs:element name='invalid'/>");

        let msg = format!("{}", err);
        assert!(msg.contains("Invalid schema syntax"));
        assert!(msg.contains("Location:"));
        assert!(msg.contains("Source:"));
    }

    #[test]
    fn test_error_conversion() {
        let parse_err = ParseError::new("test");
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_validation_outcome_helpers() {
        assert!(ValidationOutcome::valid().is_valid);
        let invalid = ValidationOutcome::invalid("bad value");
        assert!(!invalid.is_valid);
        assert_eq!(invalid.error_message.as_deref(), Some("bad value"));
    }
}
