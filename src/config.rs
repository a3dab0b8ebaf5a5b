use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Library-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct XmlConfig {
    pub parse: ParseOptions,
    pub format: FormatOptions,
    pub validation: ValidationOptions,
}

/// Options handed to the libxml2 parser and text reader
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParseOptions {
    /// Keep whitespace-only text nodes
    pub keep_blanks: bool,
    /// Forbid network access while loading external entities or DTDs
    pub no_network: bool,
    /// Merge CDATA sections into plain text nodes
    pub merge_cdata: bool,
    /// Lift the parser's hard-coded size limits
    pub huge: bool,
}

/// Pretty-printer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormatOptions {
    /// Spaces per nesting level
    pub indent: usize,
    /// Start tags longer than this wrap their attributes
    pub max_line_width: usize,
    /// Keep the `<?xml ...?>` declaration when present
    pub keep_declaration: bool,
    /// Keep comments
    pub keep_comments: bool,
}

/// Schema validation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ValidationOptions {
    pub policy: ErrorPolicy,
}

/// How schema validation problems are reported
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop at the first error
    #[default]
    Fail,
    /// Log each issue and carry on
    Log,
    /// Keep every issue for later inspection
    Collect,
}

impl std::str::FromStr for ErrorPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(ErrorPolicy::Fail),
            "log" => Ok(ErrorPolicy::Log),
            "collect" => Ok(ErrorPolicy::Collect),
            other => Err(ConfigError::Validation(format!(
                "Unknown error policy: {}",
                other
            ))),
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            keep_blanks: true,
            no_network: true,
            merge_cdata: false,
            huge: false,
        }
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            max_line_width: 120,
            keep_declaration: true,
            keep_comments: true,
        }
    }
}

const CONFIG_NAMES: [&str; 3] = ["xmlkit.toml", ".xmlkit.toml", "xmlkit.json"];

impl XmlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: XmlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: XmlConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            Some(ext) => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => match toml::from_str::<XmlConfig>(&content) {
                Ok(config) => config,
                Err(_) => serde_json::from_str(&content)?,
            },
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Find a configuration file in standard locations
    pub fn find_config_file() -> Option<PathBuf> {
        for name in CONFIG_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Some(path);
            }
        }

        let app_config_dir = dirs::config_dir()?.join("xmlkit");
        CONFIG_NAMES
            .iter()
            .map(|name| app_config_dir.join(name))
            .find(|path| path.exists())
    }

    /// Load with precedence: defaults -> discovered file -> environment
    pub fn discover() -> Result<Self> {
        let config = match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(&SystemEnvProvider)
    }

    /// Apply `XMLKIT_*` environment overrides
    pub fn apply_env(mut self, env: &impl EnvProvider) -> Result<Self> {
        if let Some(indent) = env.get("XMLKIT_INDENT") {
            self.format.indent = parse_env("XMLKIT_INDENT", &indent)?;
        }

        if let Some(width) = env.get("XMLKIT_MAX_LINE_WIDTH") {
            self.format.max_line_width = parse_env("XMLKIT_MAX_LINE_WIDTH", &width)?;
        }

        if let Some(keep_blanks) = env.get("XMLKIT_KEEP_BLANKS") {
            self.parse.keep_blanks = parse_env("XMLKIT_KEEP_BLANKS", &keep_blanks)?;
        }

        if let Some(no_network) = env.get("XMLKIT_NO_NETWORK") {
            self.parse.no_network = parse_env("XMLKIT_NO_NETWORK", &no_network)?;
        }

        if let Some(policy) = env.get("XMLKIT_ERROR_POLICY") {
            self.validation.policy = policy.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid XMLKIT_ERROR_POLICY value: {}", policy))
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.format.indent > 16 {
            return Err(ConfigError::Validation(
                "Indent cannot exceed 16 spaces".to_string(),
            ));
        }

        if self.format.max_line_width < 20 {
            return Err(ConfigError::Validation(
                "Max line width must be at least 20".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = XmlConfig::default();

        assert!(config.parse.keep_blanks);
        assert!(config.parse.no_network);
        assert!(!config.parse.merge_cdata);
        assert_eq!(config.format.indent, 2);
        assert_eq!(config.format.max_line_width, 120);
        assert_eq!(config.validation.policy, ErrorPolicy::Fail);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_config() {
        let config = XmlConfig::from_toml_str(
            r#"
[format]
indent = 4

[validation]
policy = "collect"
"#,
        )
        .unwrap();

        assert_eq!(config.format.indent, 4);
        assert_eq!(config.format.max_line_width, 120);
        assert_eq!(config.validation.policy, ErrorPolicy::Collect);
        assert!(config.parse.keep_blanks);
    }

    #[test]
    fn test_load_toml_and_json_files() {
        let temp_dir = TempDir::new().unwrap();

        let toml_path = temp_dir.path().join("xmlkit.toml");
        fs::write(&toml_path, "[parse]\nkeep_blanks = false\n").unwrap();
        let config = XmlConfig::load_from_file(&toml_path).unwrap();
        assert!(!config.parse.keep_blanks);

        let json_path = temp_dir.path().join("xmlkit.json");
        fs::write(&json_path, r#"{"format": {"max_line_width": 60}}"#).unwrap();
        let config = XmlConfig::load_from_file(&json_path).unwrap();
        assert_eq!(config.format.max_line_width, 60);
    }

    #[test]
    fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("xmlkit.yaml");
        fs::write(&path, "format: {}").unwrap();

        let result = XmlConfig::load_from_file(&path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::UnsupportedFormat(ext) if ext == "yaml"
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let result = XmlConfig::from_toml_str("[format\nindent = ");
        assert!(matches!(result.unwrap_err(), ConfigError::TomlParsing(_)));
    }

    #[test]
    fn test_environment_overrides() {
        let mut mock_env = MockEnvProvider::default();
        mock_env.set("XMLKIT_INDENT", "4");
        mock_env.set("XMLKIT_MAX_LINE_WIDTH", "80");
        mock_env.set("XMLKIT_KEEP_BLANKS", "false");
        mock_env.set("XMLKIT_ERROR_POLICY", "LOG");

        let config = XmlConfig::default().apply_env(&mock_env).unwrap();

        assert_eq!(config.format.indent, 4);
        assert_eq!(config.format.max_line_width, 80);
        assert!(!config.parse.keep_blanks);
        assert_eq!(config.validation.policy, ErrorPolicy::Log);
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut mock_env = MockEnvProvider::default();
        mock_env.set("XMLKIT_INDENT", "wide");

        let result = XmlConfig::default().apply_env(&mock_env);
        assert!(matches!(result.unwrap_err(), ConfigError::Environment(_)));

        let mut mock_env = MockEnvProvider::default();
        mock_env.set("XMLKIT_ERROR_POLICY", "ignore");
        let result = XmlConfig::default().apply_env(&mock_env);
        assert!(matches!(result.unwrap_err(), ConfigError::Environment(_)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = XmlConfig::default();
        config.format.max_line_width = 5;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Validation(_)
        ));

        let mut config = XmlConfig::default();
        config.format.indent = 40;
        assert!(config.validate().is_err());
    }
}
