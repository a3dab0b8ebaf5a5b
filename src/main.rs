use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use xmlkit::cli::{self, Cli, Command};
use xmlkit::{CollectingHandler, ErrorPolicy, FailFast, LoggingHandler, Schema, Xml, XmlConfig};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(&cli);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.verbosity().filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<XmlConfig> {
    let config = match &cli.config {
        Some(path) => XmlConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
            .apply_env(&xmlkit::config::SystemEnvProvider)?,
        None => XmlConfig::discover()?,
    };
    Ok(config)
}

/// `Ok(false)` means the command ran but found invalid input
fn run(cli: Cli) -> Result<bool> {
    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Format {
            file,
            indent,
            width,
            in_place,
        } => {
            if let Some(indent) = indent {
                config.format.indent = indent;
            }
            if let Some(width) = width {
                config.format.max_line_width = width;
            }
            config.validate()?;

            let input = read(&file)?;
            let output = xmlkit::format::pretty(&input, &config.format)
                .with_context(|| format!("Failed to format {}", file.display()))?;
            if in_place {
                std::fs::write(&file, output)
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                tracing::info!(path = %file.display(), "formatted in place");
            } else {
                print!("{}", output);
            }
            Ok(true)
        }

        Command::Query {
            file,
            expression,
            namespaces,
            text,
        } => {
            let mut xml = Xml::from_file_with(&file, &config.parse)?;
            for binding in &namespaces {
                let (prefix, uri) = cli::parse_namespace(binding).map_err(anyhow::Error::msg)?;
                xml = xml.with_namespace(&prefix, &uri);
            }

            let matches = xml.query(&expression)?;
            if matches.is_empty() {
                // Scalar expressions (count(), string(), ...) select no elements.
                if let Some(value) = xml.query_text(&expression)? {
                    println!("{}", value);
                    return Ok(true);
                }
            }
            for node in &matches {
                if text {
                    println!("{}", node.text_or_empty());
                } else {
                    println!("{}", node);
                }
            }
            tracing::info!(matches = matches.len(), "query complete");
            Ok(!matches.is_empty())
        }

        Command::Validate {
            schema,
            files,
            policy,
        } => {
            let policy = policy.unwrap_or(config.validation.policy);
            let schema = Schema::from_file(&schema)
                .with_context(|| format!("Failed to load schema {}", schema.display()))?;

            let mut all_valid = true;
            for file in &files {
                let valid = validate_one(&schema, file, policy)?;
                if valid {
                    tracing::info!(path = %file.display(), "valid");
                } else {
                    println!("{}: invalid", file.display());
                }
                all_valid &= valid;
            }
            Ok(all_valid)
        }

        Command::ToJson { file, compact } => {
            let xml = Xml::from_file_with(&file, &config.parse)?;
            let json = xml.to_json();
            let output = if compact {
                serde_json::to_string(&json)?
            } else {
                serde_json::to_string_pretty(&json)?
            };
            println!("{}", output);
            Ok(true)
        }
    }
}

fn validate_one(schema: &Schema, file: &Path, policy: ErrorPolicy) -> Result<bool> {
    match policy {
        ErrorPolicy::Fail => match schema.validate_file(file, &mut FailFast) {
            Ok(valid) => Ok(valid),
            Err(xmlkit::XmlError::Validation { issues }) => {
                for issue in &issues {
                    println!("{}: {}", file.display(), issue);
                }
                Ok(false)
            }
            Err(e) => Err(e.into()),
        },
        ErrorPolicy::Log => {
            let mut handler = LoggingHandler::with_context(file.display().to_string());
            Ok(schema.validate_file(file, &mut handler)?)
        }
        ErrorPolicy::Collect => {
            let mut handler = CollectingHandler::new();
            let valid = schema.validate_file(file, &mut handler)?;
            for issue in handler.issues() {
                println!("{}: {}", file.display(), issue);
            }
            Ok(valid)
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
