//! Shared output formatting for check results.

use anyhow::Result;
use rulecheck_core::{CheckSummary, Violation};
use serde::Serialize;

use crate::OutputFormat;

/// Prints findings as they arrive (text) or once at the end (JSON).
pub struct Printer {
    format: OutputFormat,
    tab_size: usize,
    show_hash: bool,
    collected: Vec<Violation>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    violations: &'a [Violation],
    summary: &'a CheckSummary,
    exit_code: u8,
}

impl Printer {
    /// Creates a printer.
    pub fn new(format: OutputFormat, tab_size: usize, show_hash: bool) -> Self {
        Self {
            format,
            tab_size,
            show_hash,
            collected: Vec::new(),
        }
    }

    /// Handles the findings of one file.
    pub fn violations(&mut self, found: Vec<Violation>) {
        match self.format {
            OutputFormat::Text => {
                for violation in &found {
                    println!("{}", violation.render(self.tab_size, self.show_hash));
                }
            }
            OutputFormat::Json => self.collected.extend(found),
        }
    }

    /// Prints what is left after the last file.
    ///
    /// Text output only shows totals in verbose mode.
    pub fn finish(self, summary: &CheckSummary, verbose: bool) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                if verbose {
                    print_summary(summary);
                }
            }
            OutputFormat::Json => {
                let report = JsonReport {
                    violations: &self.collected,
                    summary,
                    exit_code: summary.exit_code(),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Ok(())
    }
}

fn print_summary(summary: &CheckSummary) {
    println!("Total Files Checked: {}", summary.files_checked);
    println!(
        "Total Warnings (ignored): {}({})",
        summary.warnings, summary.ignored_warnings
    );
    println!(
        "Total Errors (ignored): {}({})",
        summary.errors, summary.ignored_errors
    );
}
