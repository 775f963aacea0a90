//! Unified diff reading, used to move ignore entries after source edits.

use super::store::IgnoreStore;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

#[allow(clippy::expect_used)]
static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("hunk header regex")
});

/// Errors reading a patch.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// IO error reading a patch file.
    #[error("Failed to read patch {path}: {source}")]
    Io {
        /// Patch file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The text contains no file patches.
    #[error("no file patches found")]
    Empty,

    /// A hunk appeared before any `---`/`+++` header.
    #[error("line {line}: hunk without file header")]
    OrphanHunk {
        /// One-based line number in the patch.
        line: usize,
    },

    /// A hunk header could not be parsed.
    #[error("line {line}: malformed hunk header `{text}`")]
    BadHunk {
        /// One-based line number in the patch.
        line: usize,
        /// Offending text.
        text: String,
    },
}

/// Line ranges of one hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunk {
    /// First line of the hunk in the old file.
    pub source_start: i64,
    /// Number of old lines covered.
    pub source_len: i64,
    /// First line of the hunk in the new file.
    pub target_start: i64,
    /// Number of new lines covered.
    pub target_len: i64,
}

impl Hunk {
    /// Line count change introduced by the hunk.
    #[must_use]
    pub fn delta(&self) -> i64 {
        self.target_len - self.source_len
    }
}

/// All hunks for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Old file name, with any `a/` prefix removed.
    pub source: String,
    /// New file name, with any `b/` prefix removed.
    pub target: String,
    /// Hunks in patch order.
    pub hunks: Vec<Hunk>,
}

/// A parsed unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    /// File patches in patch order.
    pub files: Vec<FilePatch>,
}

impl PatchSet {
    /// Parses unified diff text.
    ///
    /// # Errors
    ///
    /// Returns an error if no file patch is found or a hunk header is
    /// malformed.
    pub fn parse(text: &str) -> Result<Self, PatchError> {
        let mut files: Vec<FilePatch> = Vec::new();
        let mut pending_source: Option<String> = None;
        let mut remaining_old = 0i64;
        let mut remaining_new = 0i64;

        for (index, line) in text.lines().enumerate() {
            if remaining_old > 0 || remaining_new > 0 {
                match line.chars().next() {
                    Some('-') => remaining_old -= 1,
                    Some('+') => remaining_new -= 1,
                    Some('\\') => {}
                    _ => {
                        remaining_old -= 1;
                        remaining_new -= 1;
                    }
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("--- ") {
                pending_source = Some(header_path(rest));
            } else if let Some(rest) = line.strip_prefix("+++ ") {
                let target = header_path(rest);
                let source = pending_source.take().unwrap_or_else(|| target.clone());
                let (source, target) = strip_git_prefixes(source, target);
                files.push(FilePatch {
                    source,
                    target,
                    hunks: Vec::new(),
                });
            } else if line.starts_with("@@") {
                let hunk = parse_hunk(line).ok_or_else(|| PatchError::BadHunk {
                    line: index + 1,
                    text: line.to_string(),
                })?;
                let file = files
                    .last_mut()
                    .ok_or(PatchError::OrphanHunk { line: index + 1 })?;
                remaining_old = hunk.source_len;
                remaining_new = hunk.target_len;
                file.hunks.push(hunk);
            }
        }

        if files.is_empty() {
            return Err(PatchError::Empty);
        }
        Ok(Self { files })
    }

    /// Reads and parses a patch file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PatchError> {
        let text = std::fs::read_to_string(path).map_err(|source| PatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Moves ignore entries to follow the patched line numbers.
    ///
    /// Hunks are applied last to first so earlier shifts do not disturb the
    /// thresholds of later hunks. Returns the number of entry moves.
    pub fn apply(&self, store: &mut IgnoreStore) -> usize {
        let mut moved = 0;
        for file in &self.files {
            for hunk in file.hunks.iter().rev() {
                let delta = hunk.delta();
                if delta != 0 {
                    moved += store.bump(&file.source, hunk.source_start, delta);
                }
            }
            debug!("Applied {} hunks for {}", file.hunks.len(), file.source);
        }
        moved
    }
}

/// File name of a `---`/`+++` header, without a trailing timestamp.
fn header_path(rest: &str) -> String {
    rest.split('\t').next().unwrap_or(rest).trim_end().to_string()
}

fn strip_git_prefixes(source: String, target: String) -> (String, String) {
    let stripped_source = source.strip_prefix("a/").map(str::to_string);
    let stripped_target = target.strip_prefix("b/").map(str::to_string);
    match (stripped_source, stripped_target) {
        (Some(s), Some(t)) => (s, t),
        (None, Some(t)) if source == "/dev/null" => (source, t),
        (Some(s), None) if target == "/dev/null" => (s, target),
        _ => (source, target),
    }
}

fn parse_hunk(line: &str) -> Option<Hunk> {
    let caps = HUNK_HEADER.captures(line)?;
    let number = |i: usize, default: i64| -> Option<i64> {
        caps.get(i).map_or(Some(default), |m| m.as_str().parse().ok())
    };
    Some(Hunk {
        source_start: number(1, 0)?,
        source_len: number(2, 1)?,
        target_start: number(3, 0)?,
        target_len: number(4, 1)?,
    })
}
