//! Rule that requires files to open with a copyright comment.
//!
//! The first element after the unit decides: a comment containing `text`
//! passes, anything else is reported once without a position. The rule then
//! stops listening until the next file.
//!
//! # Configuration
//!
//! - `text`: string the leading comment must contain (default: `copyright`)

use rulecheck_core::{
    NodeEvent, NodeVisit, Position, Rule, RuleContext, RuleKind, RuleResult, RuleSettings,
    Severity, Subscriptions, TreeNode,
};
use tracing::debug;

/// Rule identifier for copyright-header.
pub const NAME: &str = "builtin.copyright_header";

/// Default text the header comment must contain.
pub const DEFAULT_TEXT: &str = "copyright";

const MESSAGE: &str = "File does not start with a copyright comment.";

/// Requires the first element of every file to be a copyright comment.
#[derive(Debug, Clone)]
pub struct CopyrightHeader {
    text: String,
}

impl Default for CopyrightHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyrightHeader {
    /// Creates the rule with the default text.
    #[must_use]
    pub fn new() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
        }
    }

    /// Sets the text the header comment must contain.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Creates the rule from rule-set settings.
    #[must_use]
    pub fn from_settings(settings: &RuleSettings) -> Self {
        match settings.get_str("text") {
            Some(text) => Self::new().text(text),
            None => Self::new(),
        }
    }
}

impl Rule for CopyrightHeader {
    fn kind(&self) -> RuleKind {
        RuleKind::Srcml
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new()
            .node("comment", NodeEvent::Start)
            .any_other(NodeEvent::Start)
    }

    fn visit_node(
        &mut self,
        ctx: &mut RuleContext<'_>,
        _visit: NodeVisit,
        _pos: Position,
        node: &TreeNode,
    ) -> RuleResult {
        if node.qualified_name() == "unit" {
            return Ok(());
        }

        let is_header = node.qualified_name() == "comment" && node.full_text().contains(&self.text);
        if !is_header {
            ctx.log(Severity::Error, Position::NONE, MESSAGE);
        }
        debug!("{} decided for {}", NAME, ctx.file_name());
        ctx.set_inactive();
        Ok(())
    }
}
