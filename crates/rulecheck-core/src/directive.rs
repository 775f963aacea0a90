//! In-source disable directives.
//!
//! Supports markers like:
//! ```text
//! goto fail; // NORC(builtin.find_word)
//! // NORCNEXTLINE(builtin.find_word, builtin.line_comment_with)
//! ```
//!
//! `NORC` suppresses the named rules on the line carrying the marker,
//! `NORCNEXTLINE` on the line after it. Only the first marker of a line
//! counts.

use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(NORCNEXTLINE|NORC)\(([^)]+)").expect("directive regex"));

/// Which line a directive applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveScope {
    /// The line carrying the marker.
    ThisLine,
    /// The line after the marker.
    NextLine,
}

/// Parsed disable directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisableDirective {
    /// Which line the directive targets.
    pub scope: DirectiveScope,
    /// Rule names listed in the directive, trimmed.
    pub rules: Vec<String>,
}

impl DisableDirective {
    /// Returns the line the directive applies to, given the marker's line.
    #[must_use]
    pub fn target_line(&self, line: i64) -> i64 {
        match self.scope {
            DirectiveScope::ThisLine => line,
            DirectiveScope::NextLine => line + 1,
        }
    }
}

/// Scans one source line for a disable directive.
#[must_use]
pub fn scan_line(text: &str) -> Option<DisableDirective> {
    let caps = DIRECTIVE.captures(text)?;
    let scope = if &caps[1] == "NORCNEXTLINE" {
        DirectiveScope::NextLine
    } else {
        DirectiveScope::ThisLine
    };
    let rules = caps[2].split(',').map(|s| s.trim().to_string()).collect();
    Some(DisableDirective { scope, rules })
}
