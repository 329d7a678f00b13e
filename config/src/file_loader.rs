//! # Configuration File Loading
//!
//! Loads configuration from TOML or YAML files.
//!
//! Supports automatic format detection based on file extension.

use crate::config::Configuration;
use std::path::Path;

/// Configuration file loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Config file has no extension")]
    NoExtension,

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String)
}

impl From<ConfigFileError> for errors::FixtureError {
    fn from(err: ConfigFileError) -> Self {
        errors::FixtureError::configuration(err.to_string())
    }
}

pub fn parse_yaml(contents: &str) -> Result<Configuration, ConfigFileError> {
    if contents.trim().is_empty() {
        return Ok(Configuration::new());
    }
    let value: serde_json::Value =
        serde_yaml::from_str(contents).map_err(|e| ConfigFileError::YamlParse(e.to_string()))?;
    Ok(Configuration::from_value(&value))
}

pub fn parse_toml(contents: &str) -> Result<Configuration, ConfigFileError> {
    let value: serde_json::Value =
        toml::from_str(contents).map_err(|e| ConfigFileError::TomlParse(e.to_string()))?;
    Ok(Configuration::from_value(&value))
}

/// Load configuration from TOML file.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_toml;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_toml(Path::new("fixtures.toml"))?;
///     println!("{:?}", config.get_string("databases.hive.table_manager_type"));
///     Ok(())
/// }
/// ```
pub fn load_from_toml(path: &Path) -> Result<Configuration, ConfigFileError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| ConfigFileError::FileNotFound(path.display().to_string()))?;
    parse_toml(&contents)
}

/// Load configuration from YAML file.
pub fn load_from_yaml(path: &Path) -> Result<Configuration, ConfigFileError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| ConfigFileError::FileNotFound(path.display().to_string()))?;
    parse_yaml(&contents)
}

/// Load configuration from file with auto-detection.
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml`: YAML format
/// - `.yml`: YAML format
pub fn load_from_file(path: &Path) -> Result<Configuration, ConfigFileError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or(ConfigFileError::NoExtension)?;

    match extension.to_lowercase().as_str() {
        "toml" => load_from_toml(path),
        "yaml" | "yml" => load_from_yaml(path),
        other => Err(ConfigFileError::UnsupportedFormat(other.to_string()))
    }
}
