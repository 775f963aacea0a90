//! # rulecheck-rules
//!
//! Built-in convention rules for rulecheck.
//!
//! Every rule here can be loaded by identifier once the catalog returned by
//! [`builtin_catalog`] is handed to a checker.
//!
//! ## Available Rules
//!
//! | Identifier | Kind | Description |
//! |------------|------|-------------|
//! | `builtin.visited_file` | FILE | Reports every file that is opened |
//! | `builtin.find_word` | LINE | Reports lines containing a configured word |
//! | `builtin.indentation` | SRCML | Requires indentation steps to be multiples of `width` |
//! | `builtin.copyright_header` | SRCML | Requires files to start with a copyright comment |
//! | `builtin.switch_cases` | SRCML | Limits case counts and requires a `default` |
//! | `builtin.line_comment_with` | SRCML | Reports line comments containing a string |
//! | `builtin.source_language` | SRCML | Reports the language of each unit |
//!
//! ## Usage
//!
//! ```ignore
//! use rulecheck_core::{Checker, RuleSettings};
//! use rulecheck_rules::builtin_catalog;
//!
//! let checker = Checker::builder(builtin_catalog())
//!     .rule("builtin.find_word", RuleSettings::new().with("word", "goto"))
//!     .build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod copyright_header;
mod find_word;
mod indentation;
mod line_comment_with;
mod source_language;
mod switch_cases;
mod visited_file;

pub use catalog::{builtin_catalog, register_builtins};
pub use copyright_header::CopyrightHeader;
pub use find_word::FindWord;
pub use indentation::Indentation;
pub use line_comment_with::LineCommentWith;
pub use source_language::SourceLanguage;
pub use switch_cases::{SwitchCases, SwitchLimits};
pub use visited_file::VisitedFile;

/// Re-export core types for convenience.
pub use rulecheck_core::{Rule, RuleSettings, Severity, Violation};

#[cfg(test)]
pub(crate) mod testing {
    use rulecheck_core::{parse_tree, Checker, RuleBox, RuleCatalog, StructuralDocument, Violation};

    const UNIT_OPEN: &str = r#"<unit xmlns="http://www.srcML.org/srcML/src" xmlns:cpp="http://www.srcML.org/srcML/cpp" xmlns:pos="http://www.srcML.org/srcML/position" revision="1.0.0" language="C" filename="test.c" pos:tabs="8">"#;

    /// Wraps srcML unit content the way `srcml --position` prints it.
    pub fn markup(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n{UNIT_OPEN}{body}</unit>\n"
        )
    }

    /// Builds a document named `test.c`, with a tree when `body` is given.
    pub fn document(source: &str, body: Option<&str>) -> StructuralDocument {
        let tree = body.map(|b| parse_tree(&markup(b)).expect("test markup should parse"));
        StructuralDocument::new("test.c", source, tree)
    }

    /// Runs a single rule over one document.
    pub fn check(name: &str, rule: RuleBox, source: &str, body: Option<&str>) -> Vec<Violation> {
        let mut checker = Checker::builder(RuleCatalog::new())
            .rule_instance(name, rule)
            .build()
            .expect("checker should build");
        checker.check_document(&document(source, body))
    }
}
