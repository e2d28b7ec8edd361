// Error types for schema loading and validation

use std::fmt;
use thiserror::Error;
use yisp_source_map::SourceInfo;

/// Errors that can occur while building or loading a schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid schema type: {0}")]
    InvalidType(String),

    #[error("Invalid schema structure: {message}")]
    InvalidStructure {
        message: String,
        location: Option<SourceInfo>,
    },

    #[error("Unresolved schema reference: {0}")]
    UnresolvedRef(String),

    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Failed to read schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid schema document: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn structure(message: impl Into<String>, location: Option<&SourceInfo>) -> Self {
        SchemaError::InvalidStructure {
            message: message.into(),
            location: location.cloned(),
        }
    }

    pub fn location(&self) -> Option<&SourceInfo> {
        match self {
            SchemaError::InvalidStructure { location, .. } => location.as_ref(),
            _ => None,
        }
    }
}

/// Result type for schema loading operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Structured validation error kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    TypeMismatch { expected: String, got: String },

    MissingRequiredProperty { property: String },

    /// Property not declared by an object that denies additional ones
    UnknownProperty { property: String },

    NumberOutOfRange {
        value: f64,
        minimum: Option<f64>,
        maximum: Option<f64>,
        exclusive_minimum: Option<f64>,
        exclusive_maximum: Option<f64>,
    },

    NumberNotMultipleOf { value: f64, multiple_of: f64 },

    StringLengthInvalid {
        length: usize,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },

    StringPatternMismatch { value: String, pattern: String },

    /// Every `oneOf` alternative failed; holds each alternative's error
    NoMatchingAlternative { errors: Vec<ValidationError> },

    /// Lambda parameter count differs from the function type's
    ArityMismatch { expected: usize, got: usize },

    /// A lambda's declared types differ from the function type's
    SignatureMismatch { detail: String },

    Other { message: String },
}

impl ValidationErrorKind {
    /// Format a human-readable message from this error kind
    pub fn message(&self) -> String {
        match self {
            ValidationErrorKind::TypeMismatch { expected, got } => {
                format!("Expected {}, got {}", expected, got)
            }
            ValidationErrorKind::MissingRequiredProperty { property } => {
                format!("Missing required property '{}'", property)
            }
            ValidationErrorKind::UnknownProperty { property } => {
                format!("Unknown property '{}'", property)
            }
            ValidationErrorKind::NumberOutOfRange {
                value,
                minimum,
                maximum,
                exclusive_minimum,
                exclusive_maximum,
            } => {
                if let Some(min) = minimum {
                    format!("Number {} is less than minimum {}", value, min)
                } else if let Some(max) = maximum {
                    format!("Number {} is greater than maximum {}", value, max)
                } else if let Some(min) = exclusive_minimum {
                    format!("Number {} is not greater than {}", value, min)
                } else if let Some(max) = exclusive_maximum {
                    format!("Number {} is not less than {}", value, max)
                } else {
                    format!("Number {} is out of range", value)
                }
            }
            ValidationErrorKind::NumberNotMultipleOf { value, multiple_of } => {
                format!("Number {} is not a multiple of {}", value, multiple_of)
            }
            ValidationErrorKind::StringLengthInvalid {
                length,
                min_length,
                max_length,
            } => {
                if let Some(min) = min_length {
                    format!("String length {} is less than minimum {}", length, min)
                } else if let Some(max) = max_length {
                    format!("String length {} is greater than maximum {}", length, max)
                } else {
                    format!("String length {} is invalid", length)
                }
            }
            ValidationErrorKind::StringPatternMismatch { value, pattern } => {
                format!("String '{}' does not match pattern '{}'", value, pattern)
            }
            ValidationErrorKind::NoMatchingAlternative { errors } => {
                let reasons: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                format!("No alternative of oneOf matched: {}", reasons.join("; "))
            }
            ValidationErrorKind::ArityMismatch { expected, got } => {
                format!("Expected a function of {} arguments, got {}", expected, got)
            }
            ValidationErrorKind::SignatureMismatch { detail } => {
                format!("Function signature mismatch: {}", detail)
            }
            ValidationErrorKind::Other { message } => message.clone(),
        }
    }
}

/// Validation error with source location information
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Instance path where the error occurred (e.g. `spec.containers.0`)
    pub instance_path: InstancePath,
    /// Location of the offending value, if it came from source
    pub location: Option<SourceInfo>,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, instance_path: InstancePath) -> Self {
        Self {
            kind,
            instance_path,
            location: None,
        }
    }

    pub fn with_location(mut self, location: Option<&SourceInfo>) -> Self {
        self.location = location.cloned();
        self
    }

    pub fn message(&self) -> String {
        self.kind.message()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "{}", self.message())
        } else {
            write!(f, "{} at {}", self.message(), self.instance_path)
        }
    }
}

/// Instance path (e.g., ["spec", "containers", 0])
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstancePath {
    segments: Vec<PathSegment>,
}

impl InstancePath {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "(root)");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// A segment in an instance path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}
