//! Per-file document: raw lines plus an optional structural tree.

use crate::types::Position;
use std::collections::BTreeMap;

/// Which side of a node a structural event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeEvent {
    /// Entering the node.
    Start,
    /// Leaving the node.
    End,
}

impl NodeEvent {
    /// Returns `"start"` or `"end"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

/// An element of the structural tree.
///
/// Positions are taken from the parser's `pos:start`/`pos:end` attributes and
/// may be absent. `markup_start`/`markup_end` are the element's lines in the
/// markup output, already translated into source line space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeNode {
    /// Namespace prefix, empty for the default namespace.
    pub prefix: String,
    /// Local tag name.
    pub name: String,
    /// Attributes keyed by (prefixed) attribute name.
    pub attributes: BTreeMap<String, String>,
    /// Source position where the element begins.
    pub start: Option<Position>,
    /// Source position where the element ends.
    pub end: Option<Position>,
    /// Markup line of the opening tag, in source line space.
    pub markup_start: i64,
    /// Markup line of the closing tag, in source line space.
    pub markup_end: i64,
    /// Text before the first child.
    pub text: String,
    /// Text following this element inside its parent.
    pub tail: String,
    /// Child elements in document order.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Creates an element with a prefix and local name.
    #[must_use]
    pub fn new(prefix: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns `prefix:name`, or the bare name for the default namespace.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.prefix, self.name)
        }
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns the source position reported for an event, or [`Position::NONE`].
    #[must_use]
    pub fn position_for(&self, event: NodeEvent) -> Position {
        match event {
            NodeEvent::Start => self.start,
            NodeEvent::End => self.end,
        }
        .unwrap_or(Position::NONE)
    }

    /// Returns the translated markup line for an event.
    #[must_use]
    pub fn markup_line(&self, event: NodeEvent) -> i64 {
        match event {
            NodeEvent::Start => self.markup_start,
            NodeEvent::End => self.markup_end,
        }
    }

    /// Concatenated text of this element and all descendants, without the tail.
    #[must_use]
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.collect_text(out);
            out.push_str(&child.tail);
        }
    }

    /// Returns the first direct child with the given qualified name.
    #[must_use]
    pub fn child(&self, qualified_name: &str) -> Option<&TreeNode> {
        self.children
            .iter()
            .find(|c| c.qualified_name() == qualified_name)
    }
}

/// Everything the engine needs to check one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralDocument {
    name: String,
    lines: Vec<String>,
    tree: Option<TreeNode>,
}

impl StructuralDocument {
    /// Creates a document from a name, raw source text and an optional tree.
    ///
    /// Lines keep their original terminators.
    #[must_use]
    pub fn new(name: impl Into<String>, source: &str, tree: Option<TreeNode>) -> Self {
        Self {
            name: name.into(),
            lines: source.split_inclusive('\n').map(String::from).collect(),
            tree,
        }
    }

    /// Creates a document without a structural tree.
    #[must_use]
    pub fn lines_only(name: impl Into<String>, source: &str) -> Self {
        Self::new(name, source, None)
    }

    /// File name as opened.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw source lines, terminators included.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines as an `i64`, the engine's line type.
    #[must_use]
    pub fn line_count(&self) -> i64 {
        i64::try_from(self.lines.len()).unwrap_or(i64::MAX)
    }

    /// Returns a one-based line, if it exists.
    #[must_use]
    pub fn line(&self, line: i64) -> Option<&str> {
        let index = usize::try_from(line.checked_sub(1)?).ok()?;
        self.lines.get(index).map(String::as_str)
    }

    /// Root of the structural tree, when the parser produced one.
    #[must_use]
    pub fn tree(&self) -> Option<&TreeNode> {
        self.tree.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_keep_terminators() {
        let doc = StructuralDocument::lines_only("a.c", "one\r\ntwo\nthree");
        assert_eq!(doc.lines(), ["one\r\n", "two\n", "three"]);
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line(2), Some("two\n"));
        assert_eq!(doc.line(0), None);
        assert_eq!(doc.line(4), None);
    }

    #[test]
    fn empty_source_has_no_lines() {
        let doc = StructuralDocument::lines_only("a.c", "");
        assert_eq!(doc.line_count(), 0);
    }

    #[test]
    fn qualified_name_omits_default_prefix() {
        assert_eq!(TreeNode::new("", "if").qualified_name(), "if");
        assert_eq!(TreeNode::new("cpp", "define").qualified_name(), "cpp:define");
    }

    #[test]
    fn full_text_joins_children_and_tails() {
        let mut inner = TreeNode::new("", "name");
        inner.text = "x".to_string();
        inner.tail = " = 1;".to_string();
        let mut outer = TreeNode::new("", "decl_stmt");
        outer.text = "int ".to_string();
        outer.children.push(inner);
        outer.tail = "\n".to_string();
        assert_eq!(outer.full_text(), "int x = 1;");
    }
}
