//! Collects rule findings, applies suppressions and keeps run totals.

use crate::ignore::{content_hash, IgnoreEntry, IgnoreStore, SuppressionFilter};
use crate::types::{CheckSummary, Position, Severity, Violation};
use std::io::{self, Write};
use tracing::debug;

/// Name the checker reports its own findings under.
pub const ENGINE_NAME: &str = "rulecheck";

/// Output options for a [`ViolationSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkOptions {
    /// Tab stop width used when rendering messages.
    pub tab_size: usize,
    /// Append the suppression hash to rendered findings.
    pub show_hash: bool,
    /// Report every warning as an error.
    pub warnings_are_errors: bool,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            tab_size: 4,
            show_hash: false,
            warnings_are_errors: false,
        }
    }
}

/// One finding as reported by a rule, before suppression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding<'a> {
    /// File the finding belongs to.
    pub file_name: &'a str,
    /// Rule that reported it.
    pub rule_name: &'a str,
    /// Severity as reported by the rule.
    pub severity: Severity,
    /// Location of the finding.
    pub position: Position,
    /// Message text.
    pub message: String,
    /// Text of the line at `position`, if that line exists.
    pub source_line: Option<&'a str>,
    /// Keep leading whitespace of `source_line` in the hash.
    pub indentation_sensitive: bool,
}

/// Receives every finding of a run.
///
/// Each finding is hashed, optionally recorded into a generated ignore list,
/// checked against the current file's [`SuppressionFilter`] and then either
/// kept as a [`Violation`] or counted as ignored.
#[derive(Debug, Default)]
pub struct ViolationSink {
    options: SinkOptions,
    baseline: IgnoreStore,
    filter: SuppressionFilter,
    generated: Option<IgnoreStore>,
    violations: Vec<Violation>,
    summary: CheckSummary,
}

impl ViolationSink {
    /// Creates a sink with no baseline ignore list.
    #[must_use]
    pub fn new(options: SinkOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Sets the ignore list findings are checked against.
    #[must_use]
    pub fn with_baseline(mut self, baseline: IgnoreStore) -> Self {
        self.baseline = baseline;
        self
    }

    /// Records every finding into a fresh ignore list as well.
    #[must_use]
    pub fn generating(mut self) -> Self {
        self.generated = Some(IgnoreStore::new());
        self
    }

    /// Output options.
    #[must_use]
    pub fn options(&self) -> SinkOptions {
        self.options
    }

    /// Loads the suppressions for a newly opened file.
    pub fn begin_file(&mut self, file_name: &str) {
        self.filter = SuppressionFilter::for_file(&self.baseline, file_name);
        debug!(
            "Loaded {} ignore entries for {}",
            self.filter.len(),
            file_name
        );
    }

    /// Counts a file as checked.
    pub fn count_file(&mut self) {
        self.summary.files_checked += 1;
    }

    /// Suppresses `rule_name` on `line` of the current file.
    pub fn disable(&mut self, rule_name: &str, line: i64) {
        self.filter.disable(rule_name, line);
    }

    /// Handles one finding.
    pub fn record(&mut self, finding: Finding<'_>) {
        let reported = if self.options.warnings_are_errors {
            Severity::Error
        } else {
            finding.severity
        };

        let hash = content_hash(
            finding.file_name,
            finding.rule_name,
            finding.severity.as_str(),
            finding.source_line,
            finding.indentation_sensitive,
        );

        if let Some(generated) = &mut self.generated {
            generated.add(
                IgnoreEntry::new(
                    hash.clone(),
                    finding.rule_name,
                    finding.severity,
                    finding.position.line,
                )
                .with_file(finding.file_name)
                .with_column(finding.position.column)
                .with_message(finding.message.clone()),
            );
        }

        if self
            .filter
            .is_filtered(finding.rule_name, finding.position.line, &hash)
        {
            match reported {
                Severity::Error => self.summary.ignored_errors += 1,
                Severity::Warning => self.summary.ignored_warnings += 1,
            }
            return;
        }

        match reported {
            Severity::Error => self.summary.errors += 1,
            Severity::Warning => self.summary.warnings += 1,
        }
        self.violations.push(Violation {
            file: finding.file_name.to_string(),
            position: finding.position,
            severity: reported,
            rule: finding.rule_name.to_string(),
            message: finding.message,
            hash,
        });
    }

    /// Reports an ERROR owned by the checker itself, with no position.
    pub fn record_failure(&mut self, file_name: &str, rule_name: &str, message: impl Into<String>) {
        self.record(Finding {
            file_name,
            rule_name,
            severity: Severity::Error,
            position: Position::NONE,
            message: message.into(),
            source_line: None,
            indentation_sensitive: false,
        });
    }

    /// Findings kept so far.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Takes the findings kept so far, leaving the counters untouched.
    pub fn take_violations(&mut self) -> Vec<Violation> {
        std::mem::take(&mut self.violations)
    }

    /// Run totals.
    #[must_use]
    pub fn summary(&self) -> CheckSummary {
        self.summary
    }

    /// The ignore list being generated, if generation is on.
    #[must_use]
    pub fn generated(&self) -> Option<&IgnoreStore> {
        self.generated.as_ref()
    }

    /// Writes and clears the generated ignore list. A no-op when generation
    /// is off.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn flush_generated<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        match &mut self.generated {
            Some(store) => store.flush_to(writer),
            None => Ok(()),
        }
    }
}
