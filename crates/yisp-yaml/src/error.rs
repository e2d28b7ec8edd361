//! Error types for YAML parsing with source locations.

use crate::SourceInfo;
use thiserror::Error;

/// Result type alias for yisp-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during YAML parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// YAML syntax error
    #[error("Parse error: {message}")]
    ParseError {
        message: String,
        location: Option<SourceInfo>,
    },

    /// Invalid YAML structure
    #[error("Invalid YAML structure: {message}")]
    InvalidStructure {
        message: String,
        location: Option<SourceInfo>,
    },
}

impl Error {
    /// The location the error was reported at, if known.
    pub fn location(&self) -> Option<&SourceInfo> {
        match self {
            Error::ParseError { location, .. } | Error::InvalidStructure { location, .. } => {
                location.as_ref()
            }
        }
    }

    /// The message without the error-kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::ParseError { message, .. } | Error::InvalidStructure { message, .. } => message,
        }
    }
}
