//! Per-file suppression lookups.

use super::entry::{IgnoreEntry, WILDCARD};
use super::store::IgnoreStore;
use std::collections::HashMap;

/// Suppression entries for the file currently being checked, grouped by rule.
///
/// Built fresh for every file so that consumed entries never leak between
/// files.
#[derive(Debug, Clone, Default)]
pub struct SuppressionFilter {
    by_rule: HashMap<String, Vec<IgnoreEntry>>,
}

impl SuppressionFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the filter for one file from a baseline store.
    #[must_use]
    pub fn for_file(store: &IgnoreStore, file_name: &str) -> Self {
        let mut filter = Self::new();
        for entry in store.entries_for(file_name) {
            filter.insert(entry.clone());
        }
        filter
    }

    /// Adds an entry.
    pub fn insert(&mut self, entry: IgnoreEntry) {
        self.by_rule
            .entry(entry.rule_name.clone())
            .or_default()
            .push(entry);
    }

    /// Suppresses every finding of `rule_name` on `line`.
    pub fn disable(&mut self, rule_name: &str, line: i64) {
        self.insert(IgnoreEntry::disabled_line(rule_name, line));
    }

    /// Returns true if the finding should not be reported.
    ///
    /// Entries for any rule (`*`) are checked before rule-specific ones. The
    /// first matching entry wins and, unless its hash is a wildcard, is
    /// consumed.
    pub fn is_filtered(&mut self, rule_name: &str, line: i64, hash: &str) -> bool {
        for key in [WILDCARD, rule_name] {
            if let Some(entries) = self.by_rule.get_mut(key) {
                if entries.iter_mut().any(|e| e.try_consume(line, hash)) {
                    return true;
                }
            }
        }
        false
    }

    /// Number of entries held, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_rule.values().map(Vec::len).sum()
    }

    /// Returns true if the filter holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
