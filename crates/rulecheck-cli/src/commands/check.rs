//! Check command implementation.

use anyhow::{bail, Context, Result};
use rulecheck_core::{Checker, SetupError, Srcml};
use rulecheck_rules::builtin_catalog;
use tracing::{debug, info};

use super::output::Printer;
use crate::config_resolver;
use crate::CheckArgs;

/// Runs the check command and returns the process exit code.
pub fn run(args: &CheckArgs, verbose: bool) -> Result<u8> {
    let project_dir = std::env::current_dir().context("Failed to read current directory")?;
    let Some(rule_sets) = config_resolver::locate(&args.configs, &project_dir) else {
        bail!("No rule-set config found; pass one with --config or create rulecheck.json");
    };
    if rule_sets.from_user_dir {
        info!("Using global config: {}", rule_sets.paths[0].display());
    }

    let mut builder = Checker::builder(builtin_catalog())
        .configs(rule_sets.paths)
        .tab_size(args.tabs)
        .show_hash(args.generate_hashes)
        .warnings_are_errors(args.werror);
    for path in &args.rule_paths {
        builder = builder.rule_path(path);
    }
    if !args.no_srcml {
        builder = builder.parser(srcml(args)?);
    }
    if let Some(path) = &args.ignore_list {
        builder = builder.ignore_list(path);
    }
    if let Some(path) = &args.generate_ignore_file {
        builder = builder.generate_ignore_file(path);
    }

    let mut checker = builder.build()?;
    if checker.registry().is_empty() {
        info!("No rules loaded");
    }

    let mut printer = Printer::new(args.format, args.tabs, args.generate_hashes);
    for path in checker.expand_sources(&args.sources) {
        printer.violations(checker.check_path(&path));
    }

    let summary = checker.finish()?;
    printer.finish(&summary, verbose)?;
    Ok(summary.exit_code())
}

fn srcml(args: &CheckArgs) -> Result<Srcml, SetupError> {
    let mut srcml = Srcml::locate(args.srcml.as_deref())?.with_tabs(args.tabs);
    if let Some(extra) = &args.srcml_args {
        srcml = srcml.with_args(extra.split_whitespace());
    }
    for mapping in &args.register_ext {
        srcml.register_ext(mapping)?;
    }
    debug!(
        "Extension to language mappings for srcml are: {:?}",
        srcml.ext_mappings()
    );
    Ok(srcml)
}
