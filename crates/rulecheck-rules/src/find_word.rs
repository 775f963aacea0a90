//! Rule that reports lines containing a configured word.
//!
//! # Configuration
//!
//! - `word` (required): the word to look for; must not contain whitespace.

use rulecheck_core::{
    Position, Rule, RuleContext, RuleError, RuleKind, RuleResult, RuleSettings, Severity,
    Subscriptions,
};

/// Rule identifier for find-word.
pub const NAME: &str = "builtin.find_word";

/// Reports the first occurrence of a word on each line.
#[derive(Debug, Clone)]
pub struct FindWord {
    word: String,
}

impl FindWord {
    /// Creates the rule for `word`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidSetting`] if `word` is empty or contains
    /// whitespace.
    pub fn new(word: impl Into<String>) -> Result<Self, RuleError> {
        let word = word.into();
        if word.is_empty() || word.chars().any(char::is_whitespace) {
            return Err(RuleError::invalid(
                "word",
                "must be a single word (no whitespace allowed)",
            ));
        }
        Ok(Self { word })
    }

    /// Creates the rule from rule-set settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `word` is missing or invalid.
    pub fn from_settings(settings: &RuleSettings) -> Result<Self, RuleError> {
        Self::new(settings.require_str("word")?)
    }

    /// The word this rule looks for.
    #[must_use]
    pub fn word(&self) -> &str {
        &self.word
    }
}

impl Rule for FindWord {
    fn kind(&self) -> RuleKind {
        RuleKind::Line
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new().lines()
    }

    fn visit_line(&mut self, ctx: &mut RuleContext<'_>, pos: Position, text: &str) -> RuleResult {
        let Some(offset) = text.find(&self.word) else {
            return Ok(());
        };
        let column = i64::try_from(text[..offset].chars().count()).unwrap_or(i64::MAX - 1) + 1;
        ctx.log(
            Severity::Warning,
            Position::new(pos.line, column),
            format!("use of the word '{}' found: {}", self.word, text.trim_end()),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::check;

    fn rule(word: &str) -> Box<FindWord> {
        Box::new(FindWord::new(word).unwrap())
    }

    #[test]
    fn test_reports_first_match_with_column() {
        let violations = check(
            NAME,
            rule("the"),
            "int a;\ncall the thing then the other\n",
            None,
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].position, Position::new(2, 6));
        assert_eq!(
            violations[0].message,
            "use of the word 'the' found: call the thing then the other"
        );
    }

    #[test]
    fn test_column_counts_characters() {
        let violations = check(NAME, rule("goto"), "/* é */ goto x;\n", None);
        assert_eq!(violations[0].position.column, 9);
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(matches!(
            FindWord::from_settings(&RuleSettings::new()),
            Err(RuleError::MissingSetting { .. })
        ));
        assert!(matches!(
            FindWord::from_settings(&RuleSettings::new().with("word", "two words")),
            Err(RuleError::InvalidSetting { .. })
        ));
        let rule = FindWord::from_settings(&RuleSettings::new().with("word", "goto")).unwrap();
        assert_eq!(rule.word(), "goto");
    }
}
