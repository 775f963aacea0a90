//! Rule that checks indentation steps.
//!
//! Each non-blank line is compared with the last accepted line: the
//! difference in indentation must be a multiple of `width`. Tabs are expanded
//! to `width` columns first. Lines inside comments are not checked.
//!
//! The rule is indentation sensitive, so suppression hashes of its findings
//! keep the line's leading whitespace.
//!
//! # Configuration
//!
//! - `width`: indentation step in columns (default: 4)

use rulecheck_core::{
    expand_tabs, NodeEvent, NodeVisit, Position, Rule, RuleContext, RuleError, RuleKind,
    RuleResult, RuleSettings, Severity, Subscriptions, TreeNode,
};

/// Rule identifier for indentation.
pub const NAME: &str = "builtin.indentation";

/// Default indentation step.
pub const DEFAULT_WIDTH: usize = 4;

/// Requires indentation changes to be multiples of a fixed width.
#[derive(Debug, Clone)]
pub struct Indentation {
    width: usize,
    last_level: usize,
    in_comment: bool,
}

impl Default for Indentation {
    fn default() -> Self {
        Self::new()
    }
}

impl Indentation {
    /// Creates the rule with the default width.
    #[must_use]
    pub fn new() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            last_level: 0,
            in_comment: false,
        }
    }

    /// Sets the indentation step.
    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    /// Creates the rule from rule-set settings.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidSetting`] if `width` is not a positive
    /// integer.
    pub fn from_settings(settings: &RuleSettings) -> Result<Self, RuleError> {
        let default = i64::try_from(DEFAULT_WIDTH).unwrap_or(4);
        let width = settings.get_int("width", default)?;
        let width = usize::try_from(width)
            .ok()
            .filter(|w| *w > 0)
            .ok_or_else(|| RuleError::invalid("width", "must be a positive integer"))?;
        Ok(Self::new().width(width))
    }
}

impl Rule for Indentation {
    fn kind(&self) -> RuleKind {
        RuleKind::Srcml
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new()
            .file_open()
            .lines()
            .node_both("comment")
    }

    fn is_indentation_sensitive(&self) -> bool {
        true
    }

    fn visit_file_open(
        &mut self,
        _ctx: &mut RuleContext<'_>,
        _pos: Position,
        _file_name: &str,
    ) -> RuleResult {
        self.last_level = 0;
        self.in_comment = false;
        Ok(())
    }

    fn visit_line(&mut self, ctx: &mut RuleContext<'_>, pos: Position, text: &str) -> RuleResult {
        if self.in_comment {
            return Ok(());
        }

        let expanded = expand_tabs(text.trim_end_matches(['\n', '\r']), self.width);
        let content = expanded.trim_start();
        if content.is_empty() {
            return Ok(());
        }

        let level = expanded.len() - content.len();
        if self.last_level.abs_diff(level) % self.width == 0 {
            self.last_level = level;
        } else {
            ctx.log(
                Severity::Error,
                pos,
                "Line found at inappropriate indentation compared to last indented line.",
            );
        }
        Ok(())
    }

    // Lines are delivered before the node events that begin on them, so the
    // opening line of a comment is still checked.
    fn visit_node(
        &mut self,
        _ctx: &mut RuleContext<'_>,
        visit: NodeVisit,
        _pos: Position,
        _node: &TreeNode,
    ) -> RuleResult {
        self.in_comment = visit.event == NodeEvent::Start;
        Ok(())
    }
}
