//! XML Schema validation
//!
//! A [`Schema`] is parsed once and can be shared between threads. What
//! happens to validation problems is decided by a [`ValidationHandler`]:
//! stop at the first error, log and continue, or collect everything.

use std::path::Path;

use crate::config::{ErrorPolicy, ParseOptions};
use crate::error::{IssueLevel, ValidationIssue, XmlError, XmlResult};
use crate::libxml2::{self, SchemaSource, ValidationOutcome, XmlSchemaPtr};
use crate::xml::Xml;

/// Strategy deciding what a validation problem means to the caller
pub trait ValidationHandler {
    /// Called once per diagnostic; an `Err` aborts validation with that error
    fn handle(&mut self, issue: &ValidationIssue) -> XmlResult<()>;
}

/// Turns the first error into `Err(XmlError::Validation)`; warnings pass
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFast;

impl ValidationHandler for FailFast {
    fn handle(&mut self, issue: &ValidationIssue) -> XmlResult<()> {
        if issue.is_error() {
            return Err(XmlError::Validation {
                issues: vec![issue.clone()],
            });
        }
        Ok(())
    }
}

/// Logs every issue through `tracing` and carries on
#[derive(Debug, Default, Clone)]
pub struct LoggingHandler {
    context: Option<String>,
}

impl LoggingHandler {
    /// Tag every log line with `context`, typically a file name
    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
        }
    }
}

impl ValidationHandler for LoggingHandler {
    fn handle(&mut self, issue: &ValidationIssue) -> XmlResult<()> {
        let context = self.context.as_deref().unwrap_or("<document>");
        match issue.level {
            IssueLevel::Warning => {
                tracing::warn!(context, line = issue.line, "{}", issue.message)
            }
            IssueLevel::Error | IssueLevel::Fatal => {
                tracing::error!(context, line = issue.line, "{}", issue.message)
            }
        }
        Ok(())
    }
}

/// Keeps every issue for later inspection
#[derive(Debug, Default, Clone)]
pub struct CollectingHandler {
    issues: Vec<ValidationIssue>,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| issue.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }

    /// `Err(XmlError::Validation)` holding every error collected so far
    pub fn into_result(self) -> XmlResult<()> {
        if self.has_errors() {
            Err(XmlError::Validation {
                issues: self.issues,
            })
        } else {
            Ok(())
        }
    }
}

impl ValidationHandler for CollectingHandler {
    fn handle(&mut self, issue: &ValidationIssue) -> XmlResult<()> {
        self.issues.push(issue.clone());
        Ok(())
    }
}

impl ErrorPolicy {
    /// Built-in handler for this policy
    pub fn handler(self) -> Box<dyn ValidationHandler> {
        match self {
            ErrorPolicy::Fail => Box::new(FailFast),
            ErrorPolicy::Log => Box::new(LoggingHandler::default()),
            ErrorPolicy::Collect => Box::new(CollectingHandler::new()),
        }
    }
}

/// A parsed XML Schema
#[derive(Debug, Clone)]
pub struct Schema {
    ptr: XmlSchemaPtr,
}

impl Schema {
    /// Parse a schema held in memory
    pub fn from_str(xsd: &str) -> XmlResult<Schema> {
        Self::build(SchemaSource::Memory(xsd.as_bytes()))
    }

    /// Parse a schema file; relative includes resolve against its location
    pub fn from_file(path: impl AsRef<Path>) -> XmlResult<Schema> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(XmlError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let c_path = libxml2::to_cstring(&path.to_string_lossy())?;
        Self::build(SchemaSource::File(&c_path))
    }

    fn build(source: SchemaSource<'_>) -> XmlResult<Schema> {
        let (result, issues) = libxml2::parse_schema(source);
        match result {
            Ok(ptr) => {
                tracing::debug!(warnings = issues.len(), "parsed XML schema");
                Ok(Schema { ptr })
            }
            Err(e) => {
                let details = if issues.is_empty() {
                    e.to_string()
                } else {
                    issues
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                };
                Err(XmlError::SchemaParse { details })
            }
        }
    }

    /// Validate a document, reporting every diagnostic to `handler`
    ///
    /// Returns whether the document is valid. The handler decides whether
    /// an invalid document is also an error.
    pub fn validate(&self, xml: &Xml, handler: &mut dyn ValidationHandler) -> XmlResult<bool> {
        let (outcome, issues) = xml.with_document_ptr(|doc| libxml2::validate_document(&self.ptr, doc))?;

        for issue in &issues {
            handler.handle(issue)?;
        }

        match outcome {
            ValidationOutcome::Valid => Ok(true),
            ValidationOutcome::Invalid { issues } => {
                tracing::debug!(issues = issues.len(), "document failed validation");
                Ok(false)
            }
            ValidationOutcome::InternalError { code } => Err(XmlError::Engine {
                details: format!("schema validation internal error (code {})", code),
            }),
        }
    }

    /// Parse and validate a document held in memory
    pub fn validate_str(&self, input: &str, handler: &mut dyn ValidationHandler) -> XmlResult<bool> {
        let xml = Xml::parse(input)?;
        self.validate(&xml, handler)
    }

    /// Parse and validate a document file
    pub fn validate_file(
        &self,
        path: impl AsRef<Path>,
        handler: &mut dyn ValidationHandler,
    ) -> XmlResult<bool> {
        let xml = Xml::from_file_with(path, &ParseOptions::default())?;
        self.validate(&xml, handler)
    }

    /// Validate with the handler an `ErrorPolicy` selects
    pub fn validate_with_policy(&self, xml: &Xml, policy: ErrorPolicy) -> XmlResult<bool> {
        let mut handler = policy.handler();
        self.validate(xml, handler.as_mut())
    }
}
