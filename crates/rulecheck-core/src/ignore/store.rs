//! In-memory ignore list with load, write and line-shift support.

use super::entry::IgnoreEntry;
use super::normalize_path;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Errors reading or writing an ignore list.
#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    /// IO error on the ignore list file.
    #[error("Failed to access ignore list {path}: {source}")]
    Io {
        /// Path of the ignore list.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

/// Ignore entries grouped by normalized file name.
///
/// Files keep the order in which they were first seen and entries keep
/// insertion order, so writing a loaded list reproduces it up to grouping.
#[derive(Debug, Clone, Default)]
pub struct IgnoreStore {
    files: Vec<(String, Vec<IgnoreEntry>)>,
    index: HashMap<String, usize>,
}

impl IgnoreStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses ignore-list text. Malformed lines are skipped with a warning.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut store = Self::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match IgnoreEntry::parse(line) {
                Ok(entry) => store.add(entry),
                Err(e) => warn!("Skipping ignore list line {}: {}", index + 1, e),
            }
        }
        store
    }

    /// Loads an ignore list from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, IgnoreError> {
        debug!("Loading ignore list: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| IgnoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Adds an entry under its normalized file name.
    pub fn add(&mut self, entry: IgnoreEntry) {
        let key = normalize_path(&entry.file_name);
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.files.push((key.clone(), Vec::new()));
                self.index.insert(key, self.files.len() - 1);
                self.files.len() - 1
            }
        };
        self.files[slot].1.push(entry);
    }

    /// Entries recorded for a file; empty if there are none.
    #[must_use]
    pub fn entries_for(&self, file_name: &str) -> &[IgnoreEntry] {
        match self.index.get(&normalize_path(file_name)) {
            Some(&slot) => &self.files[slot].1,
            None => &[],
        }
    }

    /// Shifts every entry of `file_name` at or after `old_line` by `delta`.
    ///
    /// Returns the number of entries moved.
    pub fn bump(&mut self, file_name: &str, old_line: i64, delta: i64) -> usize {
        let Some(&slot) = self.index.get(&normalize_path(file_name)) else {
            return 0;
        };
        let mut moved = 0;
        for entry in &mut self.files[slot].1 {
            if entry.line() >= old_line {
                entry.range.shift(delta);
                moved += 1;
            }
        }
        moved
    }

    /// Iterates over all entries, file by file.
    pub fn iter(&self) -> impl Iterator<Item = &IgnoreEntry> {
        self.files.iter().flat_map(|(_, entries)| entries.iter())
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.iter().map(|(_, entries)| entries.len()).sum()
    }

    /// Returns true if no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.files.clear();
        self.index.clear();
    }

    /// Renders all entries, one per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in self.iter() {
            out.push_str(&entry.render());
            out.push('\n');
        }
        out
    }

    /// Writes all entries, keeping them in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for entry in self.iter() {
            writeln!(writer, "{}", entry.render())?;
        }
        Ok(())
    }

    /// Writes all entries, then clears the store.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails; the store is left untouched then.
    pub fn flush_to<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.write_to(writer)?;
        self.clear();
        Ok(())
    }

    /// Writes the store to a file, replacing its contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), IgnoreError> {
        std::fs::write(path, self.render()).map_err(|source| IgnoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    const HASH: &str = "0123456789abcdef0123456789abcdef";

    fn sample() -> IgnoreStore {
        IgnoreStore::parse(&format!(
            "{HASH}: ./src/a.c:2: ERROR: r: first\n\
             {HASH}: ./src/a.c:13:4: WARNING: r: second\n\
             {HASH}: src/b.c:13: WARNING: r: third\n"
        ))
    }

    #[test]
    fn parse_groups_by_normalized_file() {
        let store = sample();
        assert_eq!(store.len(), 3);
        assert_eq!(store.entries_for("src/a.c").len(), 2);
        assert_eq!(store.entries_for("./src/b.c").len(), 1);
        assert!(store.entries_for("src/c.c").is_empty());
    }

    #[test]
    fn parse_skips_invalid_lines() {
        let store = IgnoreStore::parse(&format!(
            "not an entry\n\n{HASH}: a.c:1: ERROR: r: ok\n{HASH}: a.c:1: FATAL: r: bad\n"
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn bump_shifts_entries_at_or_after_threshold() {
        let mut store = sample();
        assert_eq!(store.bump("src/a.c", 13, 1000), 1);
        let lines: Vec<i64> = store.entries_for("src/a.c").iter().map(IgnoreEntry::line).collect();
        assert_eq!(lines, [2, 1013]);
        assert_eq!(store.entries_for("src/b.c")[0].line(), 13);
    }

    #[test]
    fn bump_handles_dot_slash_mismatch() {
        let mut store = IgnoreStore::new();
        store.add(IgnoreEntry::new(HASH, "r", Severity::Error, 13).with_file("./a.c"));
        assert_eq!(store.bump("a.c", 13, 1000), 1);
        assert_eq!(store.entries_for("./a.c")[0].line(), 1013);
    }

    #[test]
    fn bump_is_noop_below_threshold() {
        let mut store = sample();
        let before = store.render();
        assert_eq!(store.bump("src/a.c", 100, 5), 0);
        assert_eq!(store.bump("missing.c", 1, 5), 0);
        assert_eq!(store.render(), before);
    }

    #[test]
    fn write_keeps_and_flush_clears() {
        let mut store = sample();
        let mut out = Vec::new();
        store.write_to(&mut out).unwrap();
        assert_eq!(store.len(), 3);
        let mut flushed = Vec::new();
        store.flush_to(&mut flushed).unwrap();
        assert!(store.is_empty());
        assert_eq!(out, flushed);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
    }

    #[test]
    fn load_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ignore.txt");
        sample().save(&path).unwrap();
        let loaded = IgnoreStore::load(&path).unwrap();
        assert_eq!(loaded.render(), sample().render());
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(IgnoreStore::load(&dir.path().join("nope.txt")).is_err());
    }
}
