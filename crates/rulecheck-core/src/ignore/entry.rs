//! A single ignore-list entry and its text form.

use crate::types::Severity;

/// Hash or file name matching anything.
pub const WILDCARD: &str = "*";

/// Inclusive range of lines an entry applies to.
///
/// Negative bounds mean "no line". An open-ended range uses
/// [`LineRange::UNBOUNDED`] as its last line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    /// First line covered.
    pub first: i64,
    /// Last line covered, inclusive.
    pub last: i64,
}

impl LineRange {
    /// Upper bound of an open-ended range.
    pub const UNBOUNDED: i64 = i64::MAX;

    /// A range covering exactly one line.
    #[must_use]
    pub const fn single(line: i64) -> Self {
        Self {
            first: line,
            last: line,
        }
    }

    /// A range from `first` to the end of the file.
    #[must_use]
    pub const fn from_line(first: i64) -> Self {
        Self {
            first,
            last: Self::UNBOUNDED,
        }
    }

    /// Returns true if `line` lies inside the range.
    #[must_use]
    pub fn contains(&self, line: i64) -> bool {
        self.first <= line && line <= self.last
    }

    /// Shifts both bounds by `delta`, leaving an unbounded end unbounded.
    pub fn shift(&mut self, delta: i64) {
        self.first = self.first.saturating_add(delta);
        if self.last != Self::UNBOUNDED {
            self.last = self.last.saturating_add(delta);
        }
    }
}

/// Reasons an ignore-list line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryParseError {
    /// Fewer than four `": "`-separated fields.
    #[error("expected at least 4 fields separated by \": \", found {0}")]
    TooFewFields(usize),

    /// First field is not a 32 character hex digest.
    #[error("invalid hash `{0}`")]
    BadHash(String),

    /// Severity field is not `ERROR` or `WARNING`.
    #[error("invalid severity `{0}`")]
    BadSeverity(String),
}

/// A known finding that should not be reported again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreEntry {
    /// 32 hex digest, or [`WILDCARD`] for directive-created entries.
    pub hash: String,
    /// File name as written, or [`WILDCARD`].
    pub file_name: String,
    /// Lines the entry applies to.
    pub range: LineRange,
    /// Column, negative when absent.
    pub column: i64,
    /// Severity recorded for the finding.
    pub severity: Severity,
    /// Rule name, or [`WILDCARD`] for any rule.
    pub rule_name: String,
    /// Message recorded for the finding.
    pub message: String,
    /// Cleared after a concrete-hash entry has suppressed one finding.
    pub active: bool,
}

impl IgnoreEntry {
    /// Creates an entry for a single line.
    #[must_use]
    pub fn new(
        hash: impl Into<String>,
        rule_name: impl Into<String>,
        severity: Severity,
        line: i64,
    ) -> Self {
        Self {
            hash: hash.into(),
            file_name: WILDCARD.to_string(),
            range: LineRange::single(line),
            column: -1,
            severity,
            rule_name: rule_name.into(),
            message: String::new(),
            active: true,
        }
    }

    /// Creates a wildcard-hash entry suppressing `rule_name` on one line.
    #[must_use]
    pub fn disabled_line(rule_name: impl Into<String>, line: i64) -> Self {
        Self::new(WILDCARD, rule_name, Severity::Error, line)
    }

    /// Sets the file name.
    #[must_use]
    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Sets the column.
    #[must_use]
    pub fn with_column(mut self, column: i64) -> Self {
        self.column = column;
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// First line covered by the entry.
    #[must_use]
    pub fn line(&self) -> i64 {
        self.range.first
    }

    /// Returns true if the entry matches any hash.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.hash == WILDCARD
    }

    /// Checks the entry against a finding and consumes it on a match.
    ///
    /// Wildcard-hash entries stay active after matching.
    pub fn try_consume(&mut self, line: i64, hash: &str) -> bool {
        if !self.active || !self.range.contains(line) {
            return false;
        }
        if !self.is_wildcard() && self.hash != hash {
            return false;
        }
        if !self.is_wildcard() {
            self.active = false;
        }
        true
    }

    /// Parses one ignore-list line.
    ///
    /// `HASH: [FILE][:LINE][:COL]: SEVERITY: RULE: MESSAGE`. The message may
    /// contain `": "` and the file name may contain `:`; line and column are
    /// recognized from the right of the location field.
    ///
    /// # Errors
    ///
    /// Returns an error if the line has fewer than four fields, a malformed
    /// hash or an unknown severity.
    pub fn parse(line: &str) -> Result<Self, EntryParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let parts: Vec<&str> = line.split(": ").collect();
        if parts.len() < 4 {
            return Err(EntryParseError::TooFewFields(parts.len()));
        }

        let hash = parts[0].trim();
        if hash.len() != 32 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EntryParseError::BadHash(hash.to_string()));
        }

        let (file_name, line_num, column) = split_location(parts[1]);

        let severity = parts[2]
            .parse::<Severity>()
            .map_err(|_| EntryParseError::BadSeverity(parts[2].to_string()))?;

        Ok(Self {
            hash: hash.to_string(),
            file_name,
            range: LineRange::single(line_num),
            column,
            severity,
            rule_name: parts[3].to_string(),
            message: parts[4..].join(": "),
            active: true,
        })
    }

    /// Renders the entry in ignore-list form, without a line terminator.
    ///
    /// Absent fields are omitted together with their separator. A column is
    /// only written when a line is.
    #[must_use]
    pub fn render(&self) -> String {
        let line = (self.range.first > 0).then(|| self.range.first.to_string());
        let column = (self.range.first > 0 && self.column > 0).then(|| self.column.to_string());

        let location = [Some(self.file_name.clone()), line, column]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(":");

        [
            self.hash.as_str(),
            location.as_str(),
            self.severity.as_str(),
            self.rule_name.as_str(),
            self.message.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(": ")
    }
}

/// Splits `file[:line][:col]` from the right.
///
/// At most two trailing pieces are inspected; a piece is a number only if it
/// is all ASCII digits. Everything that is not recognized as line or column
/// stays in the file name.
fn split_location(location: &str) -> (String, i64, i64) {
    let mut pieces: Vec<&str> = location.rsplitn(3, ':').collect();
    pieces.reverse();

    match pieces.as_slice() {
        [file, a, b] => match (as_number(a), as_number(b)) {
            (Some(line), Some(col)) => ((*file).to_string(), line, col),
            (None, Some(line)) => (format!("{file}:{a}"), line, -1),
            _ => (location.to_string(), -1, -1),
        },
        [file, a] => match as_number(a) {
            Some(line) => ((*file).to_string(), line, -1),
            None => (location.to_string(), -1, -1),
        },
        _ => (location.to_string(), -1, -1),
    }
}

fn as_number(piece: &str) -> Option<i64> {
    if piece.is_empty() || !piece.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    piece.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "0123456789abcdef0123456789abcdef";

    fn entry(line: i64, column: i64) -> IgnoreEntry {
        IgnoreEntry::new(HASH, "builtin.find_word", Severity::Warning, line)
            .with_file("src/a.c")
            .with_column(column)
            .with_message("Found word: goto")
    }

    #[test]
    fn render_full_entry() {
        insta::assert_snapshot!(entry(12, 5).render(), @"0123456789abcdef0123456789abcdef: src/a.c:12:5: WARNING: builtin.find_word: Found word: goto");
    }

    #[test]
    fn render_omits_line_and_column() {
        insta::assert_snapshot!(entry(-1, -1).render(), @"0123456789abcdef0123456789abcdef: src/a.c: WARNING: builtin.find_word: Found word: goto");
    }

    #[test]
    fn round_trip_preserves_every_field() {
        for (line, column) in [(12, 5), (12, -1), (-1, -1)] {
            let original = entry(line, column);
            let parsed = IgnoreEntry::parse(&original.render()).unwrap();
            assert_eq!(parsed, original);
        }
    }

    #[test]
    fn round_trip_with_drive_letter_and_colons() {
        let original = IgnoreEntry::new(HASH, "r", Severity::Error, 7)
            .with_file("C:\\src\\a.c")
            .with_column(3)
            .with_message("a: b: c");
        let parsed = IgnoreEntry::parse(&original.render()).unwrap();
        assert_eq!(parsed, original);

        let no_line = IgnoreEntry::new(HASH, "r", Severity::Error, -1).with_file("C:\\a.c");
        assert_eq!(IgnoreEntry::parse(&no_line.render()).unwrap(), no_line);
    }

    #[test]
    fn parse_classifies_location_pieces() {
        assert_eq!(split_location("a.c"), ("a.c".to_string(), -1, -1));
        assert_eq!(split_location("a.c:4"), ("a.c".to_string(), 4, -1));
        assert_eq!(split_location("a.c:4:2"), ("a.c".to_string(), 4, 2));
        assert_eq!(split_location("C:a.c:4"), ("C:a.c".to_string(), 4, -1));
        assert_eq!(split_location("C:x:y"), ("C:x:y".to_string(), -1, -1));
    }

    #[test]
    fn parse_accepts_uppercase_hash_and_empty_message() {
        let parsed =
            IgnoreEntry::parse("0123456789ABCDEF0123456789ABCDEF: a.c:1: ERROR: rule\n").unwrap();
        assert_eq!(parsed.hash, "0123456789ABCDEF0123456789ABCDEF");
        assert_eq!(parsed.message, "");
        assert_eq!(parsed.line(), 1);
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert_eq!(
            IgnoreEntry::parse("abc: a.c: ERROR"),
            Err(EntryParseError::TooFewFields(3))
        );
        assert!(matches!(
            IgnoreEntry::parse("xyz: a.c: ERROR: rule: msg"),
            Err(EntryParseError::BadHash(_))
        ));
        assert!(matches!(
            IgnoreEntry::parse(&format!("{HASH}: a.c: INFO: rule: msg")),
            Err(EntryParseError::BadSeverity(_))
        ));
    }

    #[test]
    fn concrete_entry_is_consumed_once() {
        let mut e = entry(3, -1);
        assert!(e.try_consume(3, HASH));
        assert!(!e.try_consume(3, HASH));
    }

    #[test]
    fn wildcard_entry_matches_repeatedly() {
        let mut e = IgnoreEntry::disabled_line("r", 3);
        assert!(e.try_consume(3, "anything"));
        assert!(e.try_consume(3, "else"));
        assert!(!e.try_consume(4, "else"));
    }

    #[test]
    fn open_range_stays_open_when_shifted() {
        let mut range = LineRange::from_line(10);
        range.shift(5);
        assert_eq!(range.first, 15);
        assert_eq!(range.last, LineRange::UNBOUNDED);
        assert!(range.contains(1_000_000));
    }
}
