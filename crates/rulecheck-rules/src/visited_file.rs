//! Rule that reports every file it sees.
//!
//! Useful for confirming which files a source pattern actually selects.

use rulecheck_core::{Position, Rule, RuleContext, RuleKind, RuleResult, Severity, Subscriptions};

/// Rule identifier for visited-file.
pub const NAME: &str = "builtin.visited_file";

/// Reports a WARNING naming each opened file.
#[derive(Debug, Clone, Default)]
pub struct VisitedFile;

impl VisitedFile {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for VisitedFile {
    fn kind(&self) -> RuleKind {
        RuleKind::File
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new().file_open()
    }

    fn visit_file_open(
        &mut self,
        ctx: &mut RuleContext<'_>,
        pos: Position,
        file_name: &str,
    ) -> RuleResult {
        ctx.log(Severity::Warning, pos, format!("Visited file: {file_name}"));
        Ok(())
    }
}
