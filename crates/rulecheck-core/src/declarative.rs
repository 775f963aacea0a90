//! Pattern rules defined in TOML files on a rule path.
//!
//! A rule identifier `team.style.no_goto` that is not built in is looked up
//! as `<rule_path>/team/style/no_goto.toml`:
//!
//! ```toml
//! description = "Forbid goto"
//! pattern = '\bgoto\b'
//! message = "goto is not allowed"
//! severity = "ERROR"          # default: WARNING
//! indentation_sensitive = false
//! ```
//!
//! The rule reports every match of `pattern` on every line, with the column
//! of the match.

use crate::rule::{Rule, RuleContext, RuleKind, RuleResult, RuleSettings, Subscriptions};
use crate::types::{Position, Severity};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Errors loading a pattern rule file.
#[derive(Debug, thiserror::Error)]
pub enum PatternRuleError {
    /// IO error reading the rule file.
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        /// Rule file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The file is not a valid pattern rule.
    #[error("Failed to parse rule file {path}: {message}")]
    Parse {
        /// Rule file path.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// The pattern does not compile.
    #[error("Invalid pattern in {path}: {source}")]
    Pattern {
        /// Rule file path.
        path: PathBuf,
        /// Regex error.
        source: regex::Error,
    },
}

/// TOML shape of a pattern rule.
#[derive(Debug, Clone, Deserialize)]
struct PatternRuleDto {
    #[serde(default)]
    description: Option<String>,
    pattern: String,
    message: String,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    indentation_sensitive: bool,
}

/// A line rule reporting every regex match.
#[derive(Debug, Clone)]
pub struct PatternRule {
    description: String,
    pattern: Regex,
    message: String,
    severity: Severity,
    indentation_sensitive: bool,
}

impl PatternRule {
    /// Creates a pattern rule.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex.
    pub fn new(
        pattern: &str,
        message: impl Into<String>,
        severity: Severity,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            description: String::new(),
            pattern: Regex::new(pattern)?,
            message: message.into(),
            severity,
            indentation_sensitive: false,
        })
    }

    /// Loads a pattern rule file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or compiled.
    pub fn from_file(path: &Path) -> Result<Self, PatternRuleError> {
        let content = std::fs::read_to_string(path).map_err(|source| PatternRuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dto: PatternRuleDto =
            toml::from_str(&content).map_err(|e| PatternRuleError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let pattern = Regex::new(&dto.pattern).map_err(|source| PatternRuleError::Pattern {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            description: dto.description.unwrap_or_default(),
            pattern,
            message: dto.message,
            severity: dto.severity.unwrap_or(Severity::Warning),
            indentation_sensitive: dto.indentation_sensitive,
        })
    }

    /// Applies instance settings: `message` and `severity` override the file.
    ///
    /// Unknown severities are ignored.
    #[must_use]
    pub fn with_settings(mut self, settings: &RuleSettings) -> Self {
        if let Some(message) = settings.get_str("message") {
            self.message = message.to_string();
        }
        if let Some(severity) = settings.get_str("severity").and_then(|s| s.parse().ok()) {
            self.severity = severity;
        }
        self
    }

    /// Free-form description from the rule file.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Maps `a.b.c` to `<root>/a/b/c.toml`.
#[must_use]
pub fn rule_file_path(root: &Path, identifier: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in identifier.split('.') {
        path.push(part);
    }
    path.set_extension("toml");
    path
}

impl Rule for PatternRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Line
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new().lines()
    }

    fn is_indentation_sensitive(&self) -> bool {
        self.indentation_sensitive
    }

    fn visit_line(&mut self, ctx: &mut RuleContext<'_>, pos: Position, text: &str) -> RuleResult {
        let text = text.trim_end_matches(['\n', '\r']);
        for found in self.pattern.find_iter(text) {
            let column = text[..found.start()].chars().count() + 1;
            let column = i64::try_from(column).unwrap_or(i64::MAX);
            ctx.log(
                self.severity,
                Position::new(pos.line, column),
                self.message.clone(),
            );
        }
        Ok(())
    }
}
