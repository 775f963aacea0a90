//! Content-addressed suppression of known findings.
//!
//! An ignore list is a text file with one entry per line:
//!
//! ```text
//! 3f2a...c1: src/net/err.c:12:5: WARNING: builtin.find_word: Found word: goto
//! ```
//!
//! Entries are keyed by a hash of the file name, rule, severity and the text
//! of the offending source line, so they keep matching after unrelated edits
//! move the line around. [`IgnoreStore`] holds and persists entries,
//! [`SuppressionFilter`] answers per-file lookups during a run, and
//! [`patch`] shifts stored line numbers after a diff is applied.

mod entry;
mod filter;
pub mod patch;
mod store;

pub use entry::{EntryParseError, IgnoreEntry, LineRange, WILDCARD};
pub use filter::SuppressionFilter;
pub use store::{IgnoreError, IgnoreStore};

use md5::{Digest, Md5};
use std::fmt::Write;

/// Computes the suppression hash of a finding.
///
/// The hash covers the normalized file name, the rule name, the severity name
/// and the source line text. Leading whitespace of the line is dropped unless
/// `indentation_sensitive` is set. Pass `None` when the finding has no valid
/// source line.
#[must_use]
pub fn content_hash(
    file_name: &str,
    rule_name: &str,
    severity_name: &str,
    source_line: Option<&str>,
    indentation_sensitive: bool,
) -> String {
    let mut hasher = Md5::new();
    hasher.update(normalize_path(file_name).as_bytes());
    hasher.update(rule_name.as_bytes());
    hasher.update(severity_name.as_bytes());
    if let Some(line) = source_line {
        let line = if indentation_sensitive {
            line
        } else {
            line.trim_start()
        };
        hasher.update(line.as_bytes());
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(32);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Normalizes a file name to posix form.
///
/// Backslashes become slashes, `.` components and repeated separators are
/// removed, so `./src//a.c` and `src/a.c` compare equal.
#[must_use]
pub fn normalize_path(file_name: &str) -> String {
    let unified = file_name.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let joined = unified
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/");

    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
