//! Rule that reports the language srcML detected for each unit.

use rulecheck_core::{
    NodeEvent, NodeVisit, Position, Rule, RuleContext, RuleKind, RuleResult, Severity,
    Subscriptions, TreeNode,
};

/// Rule identifier for source-language.
pub const NAME: &str = "builtin.source_language";

/// Reports a WARNING with the `language` attribute of every unit.
#[derive(Debug, Clone, Default)]
pub struct SourceLanguage;

impl SourceLanguage {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for SourceLanguage {
    fn kind(&self) -> RuleKind {
        RuleKind::Srcml
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new().node("unit", NodeEvent::Start)
    }

    fn visit_node(
        &mut self,
        ctx: &mut RuleContext<'_>,
        _visit: NodeVisit,
        pos: Position,
        node: &TreeNode,
    ) -> RuleResult {
        if let Some(language) = node.attribute("language") {
            ctx.log(Severity::Warning, pos, format!("Language: {language}"));
        }
        Ok(())
    }
}
