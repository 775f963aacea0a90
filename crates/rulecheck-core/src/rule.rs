//! Rule trait and the types rules work with.

use crate::document::{NodeEvent, StructuralDocument, TreeNode};
use crate::sink::{Finding, ViolationSink};
use crate::types::{Position, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Which inputs a rule works from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Whole-file hooks only.
    File,
    /// Whole-file and per-line hooks.
    Line,
    /// Whole-file, per-line and structural node hooks.
    Srcml,
}

/// Errors a rule reports from construction or from a hook.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// A required setting is missing.
    #[error("missing required setting `{key}`")]
    MissingSetting {
        /// Setting name.
        key: String,
    },

    /// A setting has an unusable value.
    #[error("invalid setting `{key}`: {message}")]
    InvalidSetting {
        /// Setting name.
        key: String,
        /// What is wrong with it.
        message: String,
    },

    /// No rule with this identifier could be found.
    #[error("unknown rule `{0}`")]
    UnknownRule(String),

    /// Any other failure inside a rule.
    #[error("{0}")]
    Failed(String),
}

impl RuleError {
    /// Creates an [`RuleError::InvalidSetting`].
    #[must_use]
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Result of a rule hook.
pub type RuleResult = Result<(), RuleError>;

/// Opaque rule settings from a rule-set configuration.
///
/// Compared by value: two configured instances of the same rule with equal
/// settings are the same instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSettings(BTreeMap<String, serde_json::Value>);

impl RuleSettings {
    /// Creates empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a setting.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the raw value of a setting.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Returns true if no settings are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a string setting.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(serde_json::Value::as_str)
    }

    /// Returns a string setting or fails when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::MissingSetting`] if the setting is absent or not
    /// a string.
    pub fn require_str(&self, key: &str) -> Result<&str, RuleError> {
        self.get_str(key).ok_or_else(|| RuleError::MissingSetting {
            key: key.to_string(),
        })
    }

    /// Returns a boolean setting, accepting JSON booleans and the usual
    /// string spellings (`yes`/`no`, `true`/`false`, `on`/`off`, `1`/`0`).
    ///
    /// Missing or unrecognized values yield `default`.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.0.get(key) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => parse_bool(s).unwrap_or(default),
            Some(serde_json::Value::Number(n)) => n.as_i64().map_or(default, |n| n != 0),
            _ => default,
        }
    }

    /// Returns an integer setting given as a number or a numeric string.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidSetting`] if the value is present but not
    /// an integer.
    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, RuleError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(serde_json::Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| RuleError::invalid(key, "expected an integer")),
            Some(serde_json::Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| RuleError::invalid(key, format!("`{s}` is not an integer"))),
            Some(other) => Err(RuleError::invalid(key, format!("unexpected value {other}"))),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// How a structural handler was selected for a node event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMatch {
    /// The rule subscribed to this tag and event.
    Tag,
    /// The rule's catch-all handler for unsubscribed tags.
    AnyOther,
}

/// A structural event delivered to [`Rule::visit_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeVisit {
    /// Entering or leaving the node.
    pub event: NodeEvent,
    /// Which handler matched.
    pub matched: NodeMatch,
}

/// The hooks a rule wants to receive, declared once when the rule is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions {
    file_open: bool,
    file_close: bool,
    lines: bool,
    nodes: BTreeSet<(String, NodeEvent)>,
    any_other_start: bool,
    any_other_end: bool,
}

impl Subscriptions {
    /// No hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive [`Rule::visit_file_open`].
    #[must_use]
    pub fn file_open(mut self) -> Self {
        self.file_open = true;
        self
    }

    /// Receive [`Rule::visit_file_close`].
    #[must_use]
    pub fn file_close(mut self) -> Self {
        self.file_close = true;
        self
    }

    /// Receive [`Rule::visit_line`] for every line.
    #[must_use]
    pub fn lines(mut self) -> Self {
        self.lines = true;
        self
    }

    /// Receive `event` for nodes with the given qualified name (`if`, `cpp:define`).
    #[must_use]
    pub fn node(mut self, qualified_name: impl Into<String>, event: NodeEvent) -> Self {
        self.nodes.insert((qualified_name.into(), event));
        self
    }

    /// Receive both events for nodes with the given qualified name.
    #[must_use]
    pub fn node_both(self, qualified_name: &str) -> Self {
        self.node(qualified_name, NodeEvent::Start)
            .node(qualified_name, NodeEvent::End)
    }

    /// Receive `event` for every node without a specific subscription.
    #[must_use]
    pub fn any_other(mut self, event: NodeEvent) -> Self {
        match event {
            NodeEvent::Start => self.any_other_start = true,
            NodeEvent::End => self.any_other_end = true,
        }
        self
    }

    /// Whether file-open events are wanted.
    #[must_use]
    pub fn wants_file_open(&self) -> bool {
        self.file_open
    }

    /// Whether file-close events are wanted.
    #[must_use]
    pub fn wants_file_close(&self) -> bool {
        self.file_close
    }

    /// Whether line events are wanted.
    #[must_use]
    pub fn wants_lines(&self) -> bool {
        self.lines
    }

    /// Returns true if any structural handler is declared.
    #[must_use]
    pub fn wants_nodes(&self) -> bool {
        !self.nodes.is_empty() || self.any_other_start || self.any_other_end
    }

    /// Picks the handler for a node event: the tag handler if declared,
    /// otherwise the catch-all if declared.
    #[must_use]
    pub fn match_node(&self, qualified_name: &str, event: NodeEvent) -> Option<NodeMatch> {
        if self.nodes.contains(&(qualified_name.to_string(), event)) {
            return Some(NodeMatch::Tag);
        }
        let any_other = match event {
            NodeEvent::Start => self.any_other_start,
            NodeEvent::End => self.any_other_end,
        };
        any_other.then_some(NodeMatch::AnyOther)
    }

    /// Drops hooks the rule kind does not allow.
    ///
    /// File rules keep only open/close, line rules also keep lines.
    #[must_use]
    pub fn restricted_to(mut self, kind: RuleKind) -> Self {
        if kind != RuleKind::Srcml {
            self.nodes.clear();
            self.any_other_start = false;
            self.any_other_end = false;
        }
        if kind == RuleKind::File {
            self.lines = false;
        }
        self
    }
}

/// A pluggable check driven by the traversal engine.
///
/// Every hook has a no-op default; the engine only calls the hooks listed in
/// [`Rule::subscriptions`]. Instances keep their own state between hooks and
/// are reused for every file, so per-file state should be reset in
/// [`Rule::visit_file_open`].
///
/// # Example
///
/// ```ignore
/// use rulecheck_core::{Position, Rule, RuleContext, RuleKind, RuleResult, Severity, Subscriptions};
///
/// struct NoTabs;
///
/// impl Rule for NoTabs {
///     fn kind(&self) -> RuleKind { RuleKind::Line }
///     fn subscriptions(&self) -> Subscriptions { Subscriptions::new().lines() }
///
///     fn visit_line(&mut self, ctx: &mut RuleContext<'_>, pos: Position, text: &str) -> RuleResult {
///         if text.contains('\t') {
///             ctx.log(Severity::Warning, pos, "tab character");
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Rule: Send {
    /// The inputs this rule works from.
    fn kind(&self) -> RuleKind;

    /// Hooks this rule receives. Called once when the rule is loaded.
    fn subscriptions(&self) -> Subscriptions;

    /// Whether leading whitespace of a line is part of this rule's findings.
    ///
    /// When true, suppression hashes keep the line's indentation.
    fn is_indentation_sensitive(&self) -> bool {
        false
    }

    /// Called when a file is opened, with [`Position::NONE`].
    ///
    /// # Errors
    ///
    /// An error is reported as a finding against this rule.
    fn visit_file_open(
        &mut self,
        _ctx: &mut RuleContext<'_>,
        _pos: Position,
        _file_name: &str,
    ) -> RuleResult {
        Ok(())
    }

    /// Called after all other events of a file, with [`Position::NONE`].
    ///
    /// # Errors
    ///
    /// An error is reported as a finding against this rule.
    fn visit_file_close(
        &mut self,
        _ctx: &mut RuleContext<'_>,
        _pos: Position,
        _file_name: &str,
    ) -> RuleResult {
        Ok(())
    }

    /// Called once per source line, in order. `text` keeps its terminator.
    ///
    /// # Errors
    ///
    /// An error is reported as a finding against this rule.
    fn visit_line(&mut self, _ctx: &mut RuleContext<'_>, _pos: Position, _text: &str) -> RuleResult {
        Ok(())
    }

    /// Called for subscribed structural node events.
    ///
    /// # Errors
    ///
    /// An error is reported as a finding against this rule.
    fn visit_node(
        &mut self,
        _ctx: &mut RuleContext<'_>,
        _visit: NodeVisit,
        _pos: Position,
        _node: &TreeNode,
    ) -> RuleResult {
        Ok(())
    }
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

/// What a rule hook can see of the run: the current file and a way to report.
pub struct RuleContext<'a> {
    sink: &'a mut ViolationSink,
    document: &'a StructuralDocument,
    rule_name: &'a str,
    indentation_sensitive: bool,
    werror: bool,
    verbose: bool,
    deactivated: bool,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(
        sink: &'a mut ViolationSink,
        document: &'a StructuralDocument,
        rule_name: &'a str,
        options: RuleOptions,
    ) -> Self {
        Self {
            sink,
            document,
            rule_name,
            indentation_sensitive: options.indentation_sensitive,
            werror: options.werror,
            verbose: options.verbose,
            deactivated: false,
        }
    }

    /// Reports a finding for the current file.
    ///
    /// A rule configured with `werror` reports warnings as errors.
    pub fn log(&mut self, severity: Severity, pos: Position, message: impl Into<String>) {
        let severity = if self.werror {
            Severity::Error
        } else {
            severity
        };
        self.sink.record(Finding {
            file_name: self.document.name(),
            rule_name: self.rule_name,
            severity,
            position: pos,
            message: message.into(),
            source_line: self.document.line(pos.line),
            indentation_sensitive: self.indentation_sensitive,
        });
    }

    /// Stops delivering events to this rule for the rest of the file.
    pub fn set_inactive(&mut self) {
        self.deactivated = true;
    }

    /// Name of the file being checked.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.document.name()
    }

    /// Raw lines of the file being checked.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        self.document.lines()
    }

    /// Name under which this rule was loaded.
    #[must_use]
    pub fn rule_name(&self) -> &str {
        self.rule_name
    }

    /// Prints a diagnostic when the rule was loaded with `verbose` set.
    ///
    /// Not a substitute for [`RuleContext::log`].
    pub fn print_verbose(&self, message: &str) {
        if self.verbose {
            info!(rule = self.rule_name, "{message}");
        }
    }

    pub(crate) fn is_deactivated(&self) -> bool {
        self.deactivated
    }
}

/// Per-instance options the engine passes into every [`RuleContext`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RuleOptions {
    pub indentation_sensitive: bool,
    pub werror: bool,
    pub verbose: bool,
}
