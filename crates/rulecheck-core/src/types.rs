//! Core types for rule findings and run results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A one-based (line, column) location inside a source file.
///
/// Either field may be non-positive, meaning "not applicable". Such fields
/// are omitted whenever the position is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed), or a non-positive sentinel.
    pub line: i64,
    /// Column number (1-indexed), or a non-positive sentinel.
    pub column: i64,
}

impl Position {
    /// The "no position" sentinel, used for file open/close events.
    pub const NONE: Self = Self {
        line: -1,
        column: -1,
    };

    /// Creates a new position.
    #[must_use]
    pub const fn new(line: i64, column: i64) -> Self {
        Self { line, column }
    }

    /// Creates a position on a line with no column.
    #[must_use]
    pub const fn line(line: i64) -> Self {
        Self { line, column: -1 }
    }

    /// Returns true if the line should be shown.
    #[must_use]
    pub fn has_line(&self) -> bool {
        self.line > 0
    }

    /// Returns true if the column should be shown.
    #[must_use]
    pub fn has_column(&self) -> bool {
        self.column > 0
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Severity level for a rule finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl Severity {
    /// Returns the canonical upper-case name used in output and hashes.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a severity token is not `ERROR` or `WARNING`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity `{0}`, expected ERROR or WARNING")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ERROR" => Ok(Self::Error),
            "WARNING" => Ok(Self::Warning),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

/// A reported (unsuppressed) rule finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// File name as it was opened (may be relative).
    pub file: String,
    /// Location inside the file.
    pub position: Position,
    /// Reported severity, after any warnings-as-errors promotion.
    pub severity: Severity,
    /// Name of the rule that reported the finding.
    pub rule: String,
    /// Human-readable message.
    pub message: String,
    /// Suppression hash of the finding.
    pub hash: String,
}

impl Violation {
    /// Formats the violation as a single console line.
    ///
    /// `file:[line:][col:] SEVERITY: rule: message[: hash]`, with tabs in the
    /// message expanded to `tab_size` columns.
    #[must_use]
    pub fn render(&self, tab_size: usize, show_hash: bool) -> String {
        use std::fmt::Write;
        let mut out = format!("{}:", self.file);
        if self.position.has_line() {
            let _ = write!(out, "{}:", self.position.line);
        }
        if self.position.has_column() {
            let _ = write!(out, "{}:", self.position.column);
        }
        let _ = write!(
            out,
            " {}: {}: {}",
            self.severity,
            self.rule,
            expand_tabs(&self.message, tab_size)
        );
        if show_hash {
            out.push_str(": ");
            out.push_str(&self.hash);
        }
        out
    }
}

/// Replaces tab characters with spaces up to the next multiple of `tab_size`.
///
/// A `tab_size` of zero removes tabs entirely.
#[must_use]
pub fn expand_tabs(text: &str, tab_size: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0usize;
    for ch in text.chars() {
        match ch {
            '\t' => {
                if tab_size > 0 {
                    let pad = tab_size - (column % tab_size);
                    out.extend(std::iter::repeat(' ').take(pad));
                    column += pad;
                }
            }
            '\n' | '\r' => {
                out.push(ch);
                column = 0;
            }
            _ => {
                out.push(ch);
                column += 1;
            }
        }
    }
    out
}

/// Counters accumulated over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    /// Number of files opened and checked.
    pub files_checked: usize,
    /// Unsuppressed warnings.
    pub warnings: usize,
    /// Unsuppressed errors.
    pub errors: usize,
    /// Warnings matched by a suppression entry.
    pub ignored_warnings: usize,
    /// Errors matched by a suppression entry.
    pub ignored_errors: usize,
}

impl CheckSummary {
    /// Returns true if at least one unsuppressed error was reported.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Returns true if at least one unsuppressed warning was reported.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }

    /// Returns the process exit code for this run.
    ///
    /// `2` when an error was reported, `3` when only warnings were, `0` otherwise.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.has_errors() {
            2
        } else if self.has_warnings() {
            3
        } else {
            0
        }
    }

    /// Adds the counts of another summary to this one.
    pub fn extend(&mut self, other: &Self) {
        self.files_checked += other.files_checked;
        self.warnings += other.warnings;
        self.errors += other.errors;
        self.ignored_warnings += other.ignored_warnings;
        self.ignored_errors += other.ignored_errors;
    }
}
