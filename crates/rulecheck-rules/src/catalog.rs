//! Identifier table for the built-in rules.

use crate::{
    copyright_header, find_word, indentation, line_comment_with, source_language, switch_cases,
    visited_file, CopyrightHeader, FindWord, Indentation, LineCommentWith, SourceLanguage,
    SwitchCases, VisitedFile,
};
use rulecheck_core::{RuleBox, RuleCatalog};
use tracing::debug;

/// Returns a catalog holding every built-in rule.
#[must_use]
pub fn builtin_catalog() -> RuleCatalog {
    let mut catalog = RuleCatalog::new();
    register_builtins(&mut catalog);
    catalog
}

/// Adds every built-in rule to an existing catalog.
///
/// Existing entries with the same identifier are replaced.
pub fn register_builtins(catalog: &mut RuleCatalog) {
    catalog.register(
        visited_file::NAME,
        "Reports every file that is opened",
        |_| Ok(Box::new(VisitedFile::new()) as RuleBox),
    );
    catalog.register(
        find_word::NAME,
        "Reports lines containing the word given by `word`",
        |settings| Ok(Box::new(FindWord::from_settings(settings)?) as RuleBox),
    );
    catalog.register(
        indentation::NAME,
        "Requires indentation changes to be multiples of `width`",
        |settings| Ok(Box::new(Indentation::from_settings(settings)?) as RuleBox),
    );
    catalog.register(
        copyright_header::NAME,
        "Requires files to start with a comment containing `text`",
        |settings| Ok(Box::new(CopyrightHeader::from_settings(settings)) as RuleBox),
    );
    catalog.register(
        switch_cases::NAME,
        "Limits cases per switch and requires a default case",
        |settings| Ok(Box::new(SwitchCases::from_settings(settings)?) as RuleBox),
    );
    catalog.register(
        line_comment_with::NAME,
        "Reports line comments containing the string given by `with`",
        |settings| Ok(Box::new(LineCommentWith::from_settings(settings)?) as RuleBox),
    );
    catalog.register(
        source_language::NAME,
        "Reports the language of every unit",
        |_| Ok(Box::new(SourceLanguage::new()) as RuleBox),
    );
    debug!("Registered {} built-in rules", catalog.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulecheck_core::{RuleError, RuleSettings};

    #[test]
    fn test_lists_every_builtin() {
        let names: Vec<String> = builtin_catalog()
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        insta::assert_snapshot!(names.join("\n"), @r"
        builtin.copyright_header
        builtin.find_word
        builtin.indentation
        builtin.line_comment_with
        builtin.source_language
        builtin.switch_cases
        builtin.visited_file
        ");
    }

    #[test]
    fn test_factories_validate_settings() {
        let catalog = builtin_catalog();
        assert!(matches!(
            catalog.create("builtin.find_word", &RuleSettings::new()),
            Some(Err(RuleError::MissingSetting { .. }))
        ));
        assert!(catalog
            .create("builtin.find_word", &RuleSettings::new().with("word", "goto"))
            .is_some_and(|r| r.is_ok()));
        assert!(catalog.create("builtin.nope", &RuleSettings::new()).is_none());
    }
}
