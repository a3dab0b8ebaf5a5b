//! # xmlkit
//!
//! A convenience layer over libxml2 for reading, writing and validating XML
//! configuration fragments: an [`Xml`] node handle with XPath queries and
//! tree edits, a streaming [`XmlCursor`], XML Schema validation with
//! pluggable error handling, serde-based object binding and a
//! pretty-printer.
//!
//! ```no_run
//! use xmlkit::Xml;
//!
//! let xml = Xml::parse("<server port='8080'><name>api</name></server>")?;
//! assert_eq!(xml.attr("port").as_deref(), Some("8080"));
//! assert_eq!(xml.query_text("name")?.as_deref(), Some("api"));
//! # Ok::<(), xmlkit::XmlError>(())
//! ```

pub mod bind;
pub mod cli;
pub mod config;
pub mod convert;
pub mod cursor;
pub mod error;
pub mod flow;
pub mod format;
pub mod libxml2;
pub mod schema;
pub mod xml;

pub use bind::{XmlBean, load_bean, store_bean};
pub use cli::{Cli, VerbosityLevel};
pub use config::{ErrorPolicy, FormatOptions, ParseOptions, ValidationOptions, XmlConfig};
pub use cursor::{Elements, Event, XmlCursor};
pub use error::{IssueLevel, LibXml2Error, ValidationIssue, XmlError, XmlResult};
pub use flow::Flow;
pub use schema::{CollectingHandler, FailFast, LoggingHandler, Schema, ValidationHandler};
pub use xml::Xml;
