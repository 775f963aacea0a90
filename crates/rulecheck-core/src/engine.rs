//! Drives loaded rules over one document.
//!
//! Line events and tree events are interleaved: before a node event is
//! delivered, every source line up to the highest markup line seen so far is
//! flushed to line rules. Each line is delivered exactly once and in order,
//! whether or not a tree is present.

use crate::directive::scan_line;
use crate::document::{NodeEvent, StructuralDocument, TreeNode};
use crate::registry::{RuleRegistry, RuleSlot};
use crate::rule::{NodeVisit, Rule, RuleContext, RuleResult};
use crate::sink::ViolationSink;
use crate::types::Position;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

/// Runs every active rule of a registry over one document.
pub struct TraversalEngine<'a> {
    registry: &'a mut RuleRegistry,
    sink: &'a mut ViolationSink,
    document: &'a StructuralDocument,
    next_line: i64,
    high_water: i64,
}

impl<'a> TraversalEngine<'a> {
    /// Creates an engine for one document.
    pub fn new(
        registry: &'a mut RuleRegistry,
        sink: &'a mut ViolationSink,
        document: &'a StructuralDocument,
    ) -> Self {
        Self {
            registry,
            sink,
            document,
            next_line: 1,
            high_water: 0,
        }
    }

    /// Delivers all events of the document.
    pub fn run(mut self) {
        let document = self.document;
        debug!("Opened file for checking: {}", document.name());

        self.sink.begin_file(document.name());
        self.sink.count_file();
        self.registry.activate_all();

        self.file_open();
        match document.tree() {
            Some(root) => self.walk(root),
            None => self.flush(1, document.line_count()),
        }
        self.file_close();
    }

    fn file_open(&mut self) {
        let document = self.document;
        let name = document.name();
        for slot in self.registry.slots_mut() {
            if slot.active && slot.subscriptions().wants_file_open() {
                invoke(slot, self.sink, document, "visit_file_open", |rule, ctx| {
                    rule.visit_file_open(ctx, Position::NONE, name)
                });
            }
        }
    }

    fn file_close(&mut self) {
        let document = self.document;
        let name = document.name();
        for slot in self.registry.slots_mut() {
            if slot.active && slot.subscriptions().wants_file_close() {
                invoke(slot, self.sink, document, "visit_file_close", |rule, ctx| {
                    rule.visit_file_close(ctx, Position::NONE, name)
                });
            }
        }
    }

    fn walk(&mut self, root: &TreeNode) {
        let mut stack = vec![(root, NodeEvent::Start)];
        while let Some((node, event)) = stack.pop() {
            if event == NodeEvent::Start {
                stack.push((node, NodeEvent::End));
                stack.extend(node.children.iter().rev().map(|c| (c, NodeEvent::Start)));
            }

            self.high_water = self.high_water.max(node.markup_line(event));

            if std::ptr::eq(node, root) {
                let pos = match event {
                    NodeEvent::Start => Position::line(1),
                    NodeEvent::End => {
                        self.flush(self.next_line, self.document.line_count());
                        Position::line(self.document.line_count())
                    }
                };
                self.dispatch_node(node, event, pos);
                continue;
            }

            if self.high_water >= self.next_line {
                self.flush(self.next_line, self.high_water);
                self.next_line = self.high_water + 1;
            }
            self.dispatch_node(node, event, node.position_for(event));
        }
    }

    /// Delivers lines `from..=to`, clamped to the document.
    fn flush(&mut self, from: i64, to: i64) {
        let document = self.document;
        let from = from.max(1);
        let to = to.min(document.line_count());
        for number in from..=to {
            let Some(text) = document.line(number) else {
                continue;
            };

            if let Some(directive) = scan_line(text) {
                let target = directive.target_line(number);
                for rule in &directive.rules {
                    self.sink.disable(rule, target);
                }
            }

            let pos = Position::line(number);
            for slot in self.registry.slots_mut() {
                if slot.active && slot.subscriptions().wants_lines() {
                    invoke(slot, self.sink, document, "visit_line", |rule, ctx| {
                        rule.visit_line(ctx, pos, text)
                    });
                }
            }
        }
    }

    fn dispatch_node(&mut self, node: &TreeNode, event: NodeEvent, pos: Position) {
        let document = self.document;
        let qualified_name = node.qualified_name();
        for slot in self.registry.slots_mut() {
            if !slot.active {
                continue;
            }
            let Some(matched) = slot.subscriptions().match_node(&qualified_name, event) else {
                continue;
            };
            let visit = NodeVisit { event, matched };
            invoke(slot, self.sink, document, "visit_node", |rule, ctx| {
                rule.visit_node(ctx, visit, pos, node)
            });
        }
    }
}

/// Calls one rule hook, turning errors and panics into findings.
fn invoke<F>(
    slot: &mut RuleSlot,
    sink: &mut ViolationSink,
    document: &StructuralDocument,
    hook: &str,
    call: F,
) where
    F: FnOnce(&mut dyn Rule, &mut RuleContext<'_>) -> RuleResult,
{
    let options = slot.options();
    let (outcome, deactivated) = {
        let mut ctx = RuleContext::new(sink, document, &slot.name, options);
        let rule = slot.rule.as_mut();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(rule, &mut ctx)));
        (outcome, ctx.is_deactivated())
    };

    if deactivated {
        debug!("{} deactivated for {}", slot.name, document.name());
        slot.active = false;
    }

    let failure = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };
    error!(
        "{}: exception in {} while checking {}: {}",
        slot.name,
        hook,
        document.name(),
        failure
    );
    sink.record_failure(
        document.name(),
        &slot.name,
        format!("Exception thrown while calling {hook}. See stderr."),
    );
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RuleCatalog;
    use crate::rule::{RuleError, RuleKind, RuleSettings, Subscriptions};
    use crate::sink::SinkOptions;
    use crate::types::Severity;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    /// Records every event it receives as `kind:detail@line`.
    struct Recorder {
        log: Log,
        subscriptions: Subscriptions,
    }

    impl Rule for Recorder {
        fn kind(&self) -> RuleKind {
            RuleKind::Srcml
        }

        fn subscriptions(&self) -> Subscriptions {
            self.subscriptions.clone()
        }

        fn visit_file_open(
            &mut self,
            _ctx: &mut RuleContext<'_>,
            _pos: Position,
            name: &str,
        ) -> RuleResult {
            self.push(format!("open:{name}"));
            Ok(())
        }

        fn visit_file_close(
            &mut self,
            _ctx: &mut RuleContext<'_>,
            _pos: Position,
            name: &str,
        ) -> RuleResult {
            self.push(format!("close:{name}"));
            Ok(())
        }

        fn visit_line(&mut self, _ctx: &mut RuleContext<'_>, pos: Position, _text: &str) -> RuleResult {
            self.push(format!("line@{}", pos.line));
            Ok(())
        }

        fn visit_node(
            &mut self,
            _ctx: &mut RuleContext<'_>,
            visit: NodeVisit,
            pos: Position,
            node: &TreeNode,
        ) -> RuleResult {
            self.push(format!(
                "{}:{}@{}",
                visit.event.as_str(),
                node.qualified_name(),
                pos.line
            ));
            Ok(())
        }
    }

    impl Recorder {
        fn push(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    fn node(name: &str, markup: (i64, i64), pos: Option<(i64, i64)>, children: Vec<TreeNode>) -> TreeNode {
        let mut n = TreeNode::new("", name);
        n.markup_start = markup.0;
        n.markup_end = markup.1;
        if let Some((s, e)) = pos {
            n.start = Some(Position::line(s));
            n.end = Some(Position::line(e));
        }
        n.children = children;
        n
    }

    fn registry_with(rule: impl Rule + 'static) -> RuleRegistry {
        let mut registry = RuleRegistry::new(RuleCatalog::new());
        registry
            .add_rule("test.rule", Box::new(rule), RuleSettings::new())
            .unwrap();
        registry
    }

    fn run(registry: &mut RuleRegistry, doc: &StructuralDocument) -> ViolationSink {
        let mut sink = ViolationSink::new(SinkOptions::default());
        TraversalEngine::new(registry, &mut sink, doc).run();
        sink
    }

    fn line_events(log: &Log) -> Vec<i64> {
        log.lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.strip_prefix("line@"))
            .filter_map(|n| n.parse().ok())
            .collect()
    }

    #[test]
    fn interleaves_lines_with_nodes() {
        let log = Log::default();
        let mut registry = registry_with(Recorder {
            log: Arc::clone(&log),
            subscriptions: Subscriptions::new()
                .file_open()
                .file_close()
                .lines()
                .node_both("unit")
                .node_both("if"),
        });
        let tree = node(
            "unit",
            (1, 4),
            None,
            vec![node("if", (2, 3), Some((2, 3)), vec![])],
        );
        let doc = StructuralDocument::new("a.c", "a\nif\nend\nz\n", Some(tree));
        run(&mut registry, &doc);

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            [
                "open:a.c", "start:unit@1", "line@1", "line@2", "start:if@2", "line@3", "end:if@3",
                "line@4", "end:unit@4", "close:a.c",
            ]
        );
    }

    #[test]
    fn every_line_once_without_tree() {
        let log = Log::default();
        let mut registry = registry_with(Recorder {
            log: Arc::clone(&log),
            subscriptions: Subscriptions::new().lines(),
        });
        let doc = StructuralDocument::lines_only("a.c", "1\n2\n3\n");
        run(&mut registry, &doc);
        assert_eq!(line_events(&log), [1, 2, 3]);
    }

    #[test]
    fn markup_lines_past_the_end_are_clamped() {
        let log = Log::default();
        let mut registry = registry_with(Recorder {
            log: Arc::clone(&log),
            subscriptions: Subscriptions::new().lines(),
        });
        let tree = node(
            "unit",
            (1, 50),
            None,
            vec![
                node("expr", (40, 45), None, vec![]),
                node("expr", (3, 3), None, vec![]),
            ],
        );
        let doc = StructuralDocument::new("a.c", "1\n2\n3\n", Some(tree));
        run(&mut registry, &doc);
        assert_eq!(line_events(&log), [1, 2, 3]);
    }

    #[test]
    fn catch_all_handler_gets_unsubscribed_tags() {
        let log = Log::default();
        let mut registry = registry_with(Recorder {
            log: Arc::clone(&log),
            subscriptions: Subscriptions::new()
                .node("if", NodeEvent::Start)
                .any_other(NodeEvent::Start),
        });
        let tree = node(
            "unit",
            (1, 1),
            None,
            vec![node("if", (1, 1), None, vec![]), node("while", (1, 1), None, vec![])],
        );
        let doc = StructuralDocument::new("a.c", "x\n", Some(tree));
        run(&mut registry, &doc);
        let log = log.lock().unwrap().clone();
        assert_eq!(log, ["start:unit@1", "start:if@-1", "start:while@-1"]);
    }

    struct Faulty {
        panic: bool,
    }

    impl Rule for Faulty {
        fn kind(&self) -> RuleKind {
            RuleKind::Line
        }

        fn subscriptions(&self) -> Subscriptions {
            Subscriptions::new().lines()
        }

        fn visit_line(&mut self, _ctx: &mut RuleContext<'_>, pos: Position, _text: &str) -> RuleResult {
            if pos.line == 2 {
                if self.panic {
                    panic!("boom");
                }
                return Err(RuleError::Failed("bad line".to_string()));
            }
            Ok(())
        }
    }

    /// Records its hooks and reports line 3.
    struct Steady {
        log: Log,
    }

    impl Rule for Steady {
        fn kind(&self) -> RuleKind {
            RuleKind::Line
        }

        fn subscriptions(&self) -> Subscriptions {
            Subscriptions::new().file_open().lines().file_close()
        }

        fn visit_file_open(
            &mut self,
            _ctx: &mut RuleContext<'_>,
            _pos: Position,
            name: &str,
        ) -> RuleResult {
            self.log.lock().unwrap().push(format!("open:{name}"));
            Ok(())
        }

        fn visit_line(&mut self, ctx: &mut RuleContext<'_>, pos: Position, _text: &str) -> RuleResult {
            self.log.lock().unwrap().push(format!("line@{}", pos.line));
            if pos.line == 3 {
                ctx.log(Severity::Warning, pos, "still here");
            }
            Ok(())
        }

        fn visit_file_close(
            &mut self,
            _ctx: &mut RuleContext<'_>,
            _pos: Position,
            name: &str,
        ) -> RuleResult {
            self.log.lock().unwrap().push(format!("close:{name}"));
            Ok(())
        }
    }

    #[test]
    fn rule_failures_become_findings_and_others_continue() {
        let log = Log::default();
        let mut registry = registry_with(Faulty { panic: true });
        registry
            .add_rule(
                "test.error",
                Box::new(Faulty { panic: false }),
                RuleSettings::new(),
            )
            .unwrap();
        registry
            .add_rule(
                "test.steady",
                Box::new(Steady {
                    log: Arc::clone(&log),
                }),
                RuleSettings::new(),
            )
            .unwrap();
        let doc = StructuralDocument::lines_only("a.c", "1\n2\n3\n");
        let sink = run(&mut registry, &doc);

        assert_eq!(
            *log.lock().unwrap(),
            ["open:a.c", "line@1", "line@2", "line@3", "close:a.c"]
        );
        let found: Vec<_> = sink
            .violations()
            .iter()
            .map(|v| (v.rule.as_str(), v.severity, v.message.as_str()))
            .collect();
        assert_eq!(
            found,
            [
                (
                    "test.rule",
                    Severity::Error,
                    "Exception thrown while calling visit_line. See stderr."
                ),
                (
                    "test.error",
                    Severity::Error,
                    "Exception thrown while calling visit_line. See stderr."
                ),
                ("test.steady", Severity::Warning, "still here"),
            ]
        );
        assert!(sink.violations().iter().all(|v| v.file == "a.c"));
        let summary = sink.summary();
        assert_eq!((summary.errors, summary.warnings), (2, 1));
        assert_eq!(summary.exit_code(), 2);
    }

    struct OneShot;

    impl Rule for OneShot {
        fn kind(&self) -> RuleKind {
            RuleKind::Line
        }

        fn subscriptions(&self) -> Subscriptions {
            Subscriptions::new().lines()
        }

        fn visit_line(&mut self, ctx: &mut RuleContext<'_>, pos: Position, _text: &str) -> RuleResult {
            ctx.log(Severity::Warning, pos, "seen");
            ctx.set_inactive();
            Ok(())
        }
    }

    #[test]
    fn deactivation_lasts_until_next_file() {
        let mut registry = registry_with(OneShot);
        let mut sink = ViolationSink::new(SinkOptions::default());
        for name in ["a.c", "b.c"] {
            let doc = StructuralDocument::lines_only(name, "1\n2\n3\n");
            TraversalEngine::new(&mut registry, &mut sink, &doc).run();
        }
        assert_eq!(sink.summary().warnings, 2);
        assert_eq!(sink.summary().files_checked, 2);
    }

    struct Words;

    impl Rule for Words {
        fn kind(&self) -> RuleKind {
            RuleKind::Line
        }

        fn subscriptions(&self) -> Subscriptions {
            Subscriptions::new().lines()
        }

        fn visit_line(&mut self, ctx: &mut RuleContext<'_>, pos: Position, text: &str) -> RuleResult {
            if text.contains("goto") {
                ctx.log(Severity::Warning, pos, "goto");
            }
            Ok(())
        }
    }

    #[test]
    fn directives_suppress_this_and_next_line() {
        let mut registry = registry_with(Words);
        let doc = StructuralDocument::lines_only(
            "a.c",
            "goto a; // NORC(test.rule)\n// NORCNEXTLINE(test.rule)\ngoto b;\ngoto c;\n",
        );
        let sink = run(&mut registry, &doc);
        let summary = sink.summary();
        assert_eq!(summary.ignored_warnings, 2);
        assert_eq!(summary.warnings, 1);
        assert_eq!(sink.violations()[0].position.line, 4);
    }
}
