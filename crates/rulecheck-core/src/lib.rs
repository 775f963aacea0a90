//! # rulecheck-core
//!
//! Core framework for checking source-code conventions with pluggable rules.
//!
//! Source files are read into a [`StructuralDocument`] (raw lines plus an
//! optional srcML tree), and the [`TraversalEngine`] walks both streams
//! together, dispatching to [`Rule`] instances held by a [`RuleRegistry`].
//! Findings flow through the [`ViolationSink`], which applies content-hash
//! suppressions from an [`IgnoreStore`].
//!
//! It includes:
//!
//! - [`Rule`] trait with file, line and structural hooks
//! - [`Checker`] for orchestrating a run
//! - [`IgnoreStore`] and [`SuppressionFilter`] for baselines and disable directives
//! - [`Srcml`] for producing structural trees
//!
//! ## Example
//!
//! ```ignore
//! use rulecheck_core::{Checker, RuleCatalog, RuleSettings};
//!
//! let mut checker = Checker::builder(RuleCatalog::new())
//!     .rule_path("./rules")
//!     .rule("team.no_goto", RuleSettings::new())
//!     .build()?;
//!
//! for violation in checker.check_sources(&["src/**/*.c".to_string()]) {
//!     println!("{}", violation.render(4, false));
//! }
//! let summary = checker.finish()?;
//! std::process::exit(i32::from(summary.exit_code()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod checker;
mod config;
mod declarative;
mod directive;
mod document;
mod engine;
mod registry;
mod rule;
mod sink;
mod srcml;
mod types;
mod walker;

/// Ignore lists, suppression filters and patch reconciliation.
pub mod ignore;

pub use checker::{Checker, CheckerBuilder, SetupError};
pub use config::{ConfigError, ConfigFormat, RuleEntry, RuleSetConfig};
pub use declarative::{rule_file_path, PatternRule, PatternRuleError};
pub use directive::{scan_line, DirectiveScope, DisableDirective};
pub use document::{NodeEvent, StructuralDocument, TreeNode};
pub use engine::TraversalEngine;
pub use ignore::{IgnoreEntry, IgnoreStore, SuppressionFilter};
pub use registry::{
    LoadOutcome, LoadReport, RuleCatalog, RuleFactory, RuleRegistry, RuleSlot,
};
pub use rule::{
    NodeMatch, NodeVisit, Rule, RuleBox, RuleContext, RuleError, RuleKind, RuleResult,
    RuleSettings, Subscriptions,
};
pub use sink::{Finding, SinkOptions, ViolationSink, ENGINE_NAME};
pub use srcml::{parse_tree, Srcml, SrcmlError, StructuralParser};
pub use types::{expand_tabs, CheckSummary, Position, Severity, UnknownSeverity, Violation};
pub use walker::{read_document, FileWalker, STDIN_SOURCE};
