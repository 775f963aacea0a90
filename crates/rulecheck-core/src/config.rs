//! Rule-set configuration files.
//!
//! A rule set lists the rules to load and the settings each instance is
//! built with:
//!
//! ```json
//! { "rules": [ { "name": "builtin.find_word", "settings": { "word": "goto" } } ] }
//! ```
//!
//! The same shape is accepted as TOML when the file name ends in `.toml`.

use crate::rule::RuleSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A rule-set configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetConfig {
    /// Rules to load, in order.
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// One configured rule instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Rule identifier, e.g. `builtin.find_word`.
    pub name: String,

    /// Settings passed to the rule.
    #[serde(default)]
    pub settings: RuleSettings,
}

/// Input format of a rule-set configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON, the default.
    Json,
    /// TOML.
    Toml,
}

impl ConfigFormat {
    /// Picks the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

impl RuleSetConfig {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a rule set, choosing the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, ConfigFormat::from_path(path))
    }

    /// Parses a rule set from text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid rule set.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                message: e.to_string(),
            }),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse {
                message: e.to_string(),
            }),
        }
    }

    /// Adds a rule entry.
    #[must_use]
    pub fn rule(mut self, name: impl Into<String>, settings: RuleSettings) -> Self {
        self.rules.push(RuleEntry {
            name: name.into(),
            settings,
        });
        self
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },
}
