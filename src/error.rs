use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// Main library error type; every engine failure surfaces as one of these
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error at line {line}: {message}")]
    Parse { message: String, line: i32 },

    #[error("XPath error: '{expression}' - {reason}")]
    XPath { expression: String, reason: String },

    #[error("Schema parsing error: {details}")]
    SchemaParse { details: String },

    #[error("XML validation failed: {}", summarize(.issues))]
    Validation { issues: Vec<ValidationIssue> },

    #[error("Invalid XML name: '{0}'")]
    InvalidName(String),

    #[error("Invalid value at {path}: '{value}' - {reason}")]
    InvalidValue {
        path: String,
        value: String,
        reason: String,
    },

    #[error("Binding error: {0}")]
    Binding(String),

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Format error at offset {position}: {reason}")]
    Format { position: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LibXML2 internal error: {details}")]
    Engine { details: String },
}

/// LibXML2-specific error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: null pointer returned")]
    SchemaParseFailed,

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("XPath context creation failed")]
    XPathContextCreationFailed,

    #[error("Text reader creation failed")]
    ReaderCreationFailed,

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("Input too large for libxml2: {size} bytes")]
    InputTooLarge { size: usize },

    #[error("String contains an interior NUL byte")]
    InteriorNul,
}

impl From<LibXml2Error> for XmlError {
    fn from(err: LibXml2Error) -> Self {
        XmlError::Engine {
            details: err.to_string(),
        }
    }
}

/// Severity reported by libxml2 for a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueLevel {
    Warning,
    Error,
    Fatal,
}

impl IssueLevel {
    /// Map the engine's `xmlErrorLevel` value
    pub fn from_code(level: i32) -> Self {
        match level {
            0 | 1 => IssueLevel::Warning,
            2 => IssueLevel::Error,
            _ => IssueLevel::Fatal,
        }
    }
}

impl fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueLevel::Warning => f.write_str("warning"),
            IssueLevel::Error => f.write_str("error"),
            IssueLevel::Fatal => f.write_str("fatal"),
        }
    }
}

/// One diagnostic produced while parsing or validating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: IssueLevel,
    pub message: String,
    pub line: Option<u32>,
}

impl ValidationIssue {
    pub fn new(level: IssueLevel, message: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            level,
            message: message.into(),
            line,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level >= IssueLevel::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {}): {}", self.level, line, self.message),
            None => write!(f, "{}: {}", self.level, self.message),
        }
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    match issues {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

/// Result type alias for convenience
pub type XmlResult<T> = std::result::Result<T, XmlError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
