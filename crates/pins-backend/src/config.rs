//! Code generation configuration
//!
//! Loaded from a TOML document, every field optional:
//!
//! ```toml
//! entry = "main"
//! exit = "exit"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Options of the segment assembler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    /// Function called by the program prologue
    pub entry: String,
    /// External routine called after the entry function returns
    pub exit: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            entry: "main".to_string(),
            exit: "exit".to_string(),
        }
    }
}

impl CodegenConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        Self::parse(source, Path::new("<string>"))
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source, path)
    }

    fn parse(source: &str, file: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source).map_err(|error| ConfigError::TomlParseError {
            file: file.to_path_buf(),
            error,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that both routine names are usable labels
    pub fn validate(&self) -> ConfigResult<()> {
        if self.entry.trim().is_empty() {
            return Err(ConfigError::ValidationError("entry must not be empty".to_string()));
        }
        if self.exit.trim().is_empty() {
            return Err(ConfigError::ValidationError("exit must not be empty".to_string()));
        }
        if self.entry == self.exit {
            return Err(ConfigError::ValidationError(format!(
                "entry and exit must differ (both are `{}`)",
                self.entry
            )));
        }
        Ok(())
    }
}
