//! Rule that reports line comments containing a string.
//!
//! # Configuration
//!
//! - `with` (required): the string to look for

use rulecheck_core::{
    NodeEvent, NodeVisit, Position, Rule, RuleContext, RuleError, RuleKind, RuleResult,
    RuleSettings, Severity, Subscriptions, TreeNode,
};

/// Rule identifier for line-comment-with.
pub const NAME: &str = "builtin.line_comment_with";

/// Reports `//` style comments that contain a configured string.
#[derive(Debug, Clone)]
pub struct LineCommentWith {
    with: String,
}

impl LineCommentWith {
    /// Creates the rule for `with`.
    #[must_use]
    pub fn new(with: impl Into<String>) -> Self {
        Self { with: with.into() }
    }

    /// Creates the rule from rule-set settings.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::MissingSetting`] if `with` is absent.
    pub fn from_settings(settings: &RuleSettings) -> Result<Self, RuleError> {
        Ok(Self::new(settings.require_str("with")?))
    }
}

impl Rule for LineCommentWith {
    fn kind(&self) -> RuleKind {
        RuleKind::Srcml
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new().node("comment", NodeEvent::Start)
    }

    fn visit_node(
        &mut self,
        ctx: &mut RuleContext<'_>,
        _visit: NodeVisit,
        pos: Position,
        node: &TreeNode,
    ) -> RuleResult {
        if node.attribute("type") != Some("line") {
            return Ok(());
        }
        let text = node.full_text();
        if text.contains(&self.with) {
            ctx.log(
                Severity::Warning,
                pos,
                format!("Found line comment {}", text.trim_end()),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::check;

    const SOURCE: &str = "int x; // TODO: rename\n/* TODO: block */\n// done\n";

    const MARKUP: &str = r#"<decl_stmt pos:start="1:1" pos:end="1:6"><decl pos:start="1:1" pos:end="1:5"><type pos:start="1:1" pos:end="1:3"><name pos:start="1:1" pos:end="1:3">int</name></type> <name pos:start="1:5" pos:end="1:5">x</name></decl>;</decl_stmt> <comment type="line" pos:start="1:8" pos:end="1:22">// TODO: rename</comment>
<comment type="block" pos:start="2:1" pos:end="2:17">/* TODO: block */</comment>
<comment type="line" pos:start="3:1" pos:end="3:7">// done</comment>
"#;

    #[test]
    fn test_reports_matching_line_comments_only() {
        let violations = check(NAME, Box::new(LineCommentWith::new("TODO")), SOURCE, Some(MARKUP));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].position, Position::new(1, 8));
        assert_eq!(violations[0].message, "Found line comment // TODO: rename");
    }

    #[test]
    fn test_requires_with_setting() {
        assert!(LineCommentWith::from_settings(&RuleSettings::new()).is_err());
        assert!(LineCommentWith::from_settings(&RuleSettings::new().with("with", "x")).is_ok());
    }
}
