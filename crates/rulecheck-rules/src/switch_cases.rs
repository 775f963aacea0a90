//! Rule that limits the size of switch statements.
//!
//! # Detected Patterns
//!
//! - More than `warn_over` cases: WARNING
//! - More than `error_over` cases: ERROR
//! - No `default` case: ERROR
//!
//! Findings are reported at the start of the switch. Nested switches are
//! counted separately.
//!
//! # Configuration
//!
//! - `warn_over`: case count above which a warning is reported (default: 10)
//! - `error_over`: case count above which an error is reported (default: 20)

use rulecheck_core::{
    NodeEvent, NodeVisit, Position, Rule, RuleContext, RuleError, RuleKind, RuleResult,
    RuleSettings, Severity, Subscriptions, TreeNode,
};

/// Rule identifier for switch-cases.
pub const NAME: &str = "builtin.switch_cases";

/// Configuration for case count limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchLimits {
    /// Case count above which a warning is reported.
    pub warn_over: u32,
    /// Case count above which an error is reported.
    pub error_over: u32,
}

impl Default for SwitchLimits {
    fn default() -> Self {
        Self {
            warn_over: 10,
            error_over: 20,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenSwitch {
    start: Position,
    cases: u32,
    has_default: bool,
}

/// Limits case counts and requires a default case.
#[derive(Debug, Clone, Default)]
pub struct SwitchCases {
    limits: SwitchLimits,
    open: Vec<OpenSwitch>,
}

impl SwitchCases {
    /// Creates the rule with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the warning threshold.
    #[must_use]
    pub fn warn_over(mut self, max: u32) -> Self {
        self.limits.warn_over = max;
        self
    }

    /// Sets the error threshold.
    #[must_use]
    pub fn error_over(mut self, max: u32) -> Self {
        self.limits.error_over = max;
        self
    }

    /// Creates the rule from rule-set settings.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidSetting`] if a limit is not a
    /// non-negative integer.
    pub fn from_settings(settings: &RuleSettings) -> Result<Self, RuleError> {
        let defaults = SwitchLimits::default();
        Ok(Self::new()
            .warn_over(limit(settings, "warn_over", defaults.warn_over)?)
            .error_over(limit(settings, "error_over", defaults.error_over)?))
    }

    fn close(&self, ctx: &mut RuleContext<'_>, switch: OpenSwitch) {
        let SwitchLimits {
            warn_over,
            error_over,
        } = self.limits;
        let cases = switch.cases;
        if cases > error_over {
            ctx.log(
                Severity::Error,
                switch.start,
                format!("Switch statement has {cases} cases which is more than the limit of {error_over}."),
            );
        } else if cases > warn_over {
            ctx.log(
                Severity::Warning,
                switch.start,
                format!(
                    "Switch statement has {cases} cases which is a lot but not more than the limit of {error_over}."
                ),
            );
        }

        if !switch.has_default {
            ctx.log(
                Severity::Error,
                switch.start,
                "Switch statement does not have a required default case.",
            );
        }
    }
}

fn limit(settings: &RuleSettings, key: &str, default: u32) -> Result<u32, RuleError> {
    let value = settings.get_int(key, i64::from(default))?;
    u32::try_from(value).map_err(|_| RuleError::invalid(key, "must be a non-negative integer"))
}

impl Rule for SwitchCases {
    fn kind(&self) -> RuleKind {
        RuleKind::Srcml
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new()
            .file_open()
            .node_both("switch")
            .node("case", NodeEvent::Start)
            .node("default", NodeEvent::Start)
    }

    fn visit_file_open(
        &mut self,
        _ctx: &mut RuleContext<'_>,
        _pos: Position,
        _file_name: &str,
    ) -> RuleResult {
        self.open.clear();
        Ok(())
    }

    fn visit_node(
        &mut self,
        ctx: &mut RuleContext<'_>,
        visit: NodeVisit,
        pos: Position,
        node: &TreeNode,
    ) -> RuleResult {
        match (node.name.as_str(), visit.event) {
            ("switch", NodeEvent::Start) => self.open.push(OpenSwitch {
                start: pos,
                cases: 0,
                has_default: false,
            }),
            ("switch", NodeEvent::End) => {
                if let Some(switch) = self.open.pop() {
                    self.close(ctx, switch);
                }
            }
            ("case", _) => {
                if let Some(switch) = self.open.last_mut() {
                    switch.cases += 1;
                }
            }
            ("default", _) => {
                if let Some(switch) = self.open.last_mut() {
                    switch.has_default = true;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::check;

    fn case(line: u32) -> String {
        format!(r#"<case pos:start="{line}:1" pos:end="{line}:7">case <expr><literal type="number">{line}</literal></expr>:</case>"#)
    }

    /// A switch on line `line` with `cases` cases on the following lines.
    fn switch(line: u32, cases: u32, default: bool, inner: &str) -> String {
        let mut out = format!(
            r#"<switch pos:start="{line}:1" pos:end="{line}:1">switch <condition>(<expr><name>x</name></expr>)</condition> <block>{{<block_content>"#
        );
        for i in 1..=cases {
            out.push_str(&case(line + i));
        }
        if default {
            out.push_str("<default>default:</default>");
        }
        out.push_str(inner);
        out.push_str("</block_content>}</block></switch>");
        out
    }

    fn run(rule: SwitchCases, markup: &str) -> Vec<String> {
        check(NAME, Box::new(rule), "switch (x) {}\n", Some(markup))
            .iter()
            .map(|v| format!("{} {} {}", v.position, v.severity, v.message))
            .collect()
    }

    #[test]
    fn test_small_switch_with_default_passes() {
        assert!(run(SwitchCases::new(), &switch(1, 3, true, "")).is_empty());
    }

    #[test]
    fn test_reports_thresholds_and_missing_default() {
        let rule = SwitchCases::new().warn_over(2).error_over(4);
        insta::assert_snapshot!(run(rule, &switch(1, 3, false, "")).join("\n"), @r"
        1:1 WARNING Switch statement has 3 cases which is a lot but not more than the limit of 4.
        1:1 ERROR Switch statement does not have a required default case.
        ");

        let rule = SwitchCases::new().warn_over(2).error_over(4);
        insta::assert_snapshot!(run(rule, &switch(1, 5, true, "")).join("\n"), @"1:1 ERROR Switch statement has 5 cases which is more than the limit of 4.");
    }

    #[test]
    fn test_nested_switches_count_separately() {
        let rule = SwitchCases::new().warn_over(1).error_over(10);
        let inner = switch(10, 2, true, "");
        insta::assert_snapshot!(run(rule, &switch(1, 1, true, &inner)).join("\n"), @"10:1 WARNING Switch statement has 2 cases which is a lot but not more than the limit of 10.");
    }

    #[test]
    fn test_limit_settings() {
        let rule = SwitchCases::from_settings(
            &RuleSettings::new().with("warn_over", 3).with("error_over", "7"),
        )
        .unwrap();
        assert_eq!(
            rule.limits,
            SwitchLimits {
                warn_over: 3,
                error_over: 7
            }
        );
        assert!(SwitchCases::from_settings(&RuleSettings::new().with("warn_over", -1)).is_err());
    }
}
