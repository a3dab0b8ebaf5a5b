use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::ErrorPolicy;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
    /// Show all available debugging information
    Debug,
}

impl VerbosityLevel {
    /// Default `tracing` filter directive for this level
    pub fn filter_directive(self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "info",
            VerbosityLevel::Debug => "debug",
        }
    }
}

/// Format, query, validate and convert XML documents
#[derive(Parser, Debug, Clone)]
#[command(name = "xmlkit")]
#[command(about = "Format, query, validate and convert XML documents")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON); discovered automatically when absent
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output (repeat for debug output)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Pretty-print a document
    Format {
        file: PathBuf,

        /// Spaces per nesting level
        #[arg(long = "indent")]
        indent: Option<usize>,

        /// Line width before attributes wrap
        #[arg(long = "width")]
        width: Option<usize>,

        /// Rewrite the file instead of printing it
        #[arg(short = 'i', long = "in-place")]
        in_place: bool,
    },

    /// Evaluate an XPath expression and print every match
    Query {
        file: PathBuf,

        expression: String,

        /// Namespace binding usable in the expression (prefix=uri)
        #[arg(short = 'n', long = "namespace", action = clap::ArgAction::Append)]
        namespaces: Vec<String>,

        /// Print text content instead of markup
        #[arg(short = 't', long = "text")]
        text: bool,
    },

    /// Validate documents against an XML Schema
    Validate {
        #[arg(short = 's', long = "schema")]
        schema: PathBuf,

        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// What a validation error does: fail, log or collect
        #[arg(long = "policy")]
        policy: Option<ErrorPolicy>,
    },

    /// Print a document as JSON
    ToJson {
        file: PathBuf,

        #[arg(long = "compact")]
        compact: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            return VerbosityLevel::Quiet;
        }
        match self.verbose {
            0 => VerbosityLevel::Normal,
            1 => VerbosityLevel::Verbose,
            _ => VerbosityLevel::Debug,
        }
    }
}

/// Split a `prefix=uri` namespace argument
pub fn parse_namespace(binding: &str) -> Result<(String, String), String> {
    match binding.split_once('=') {
        Some((prefix, uri)) if !prefix.is_empty() && !uri.is_empty() => {
            Ok((prefix.to_string(), uri.to_string()))
        }
        _ => Err(format!(
            "Invalid namespace binding '{}', expected prefix=uri",
            binding
        )),
    }
}
