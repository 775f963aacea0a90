//! rulecheck CLI tool.
//!
//! Usage:
//! ```bash
//! rulecheck check [OPTIONS] <SOURCES>...
//! rulecheck update-ignores -i <FILE> -p <PATCH>...
//! rulecheck list-rules
//! ```
//!
//! Exit codes: 0 clean, 1 setup failure, 2 errors reported, 3 only warnings
//! reported.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rulecheck_core::SetupError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Checks source files against pluggable convention rules
#[derive(Parser)]
#[command(name = "rulecheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check source files
    Check(CheckArgs),

    /// Move ignore list entries to follow applied patches
    UpdateIgnores {
        /// Ignore list to update
        #[arg(short = 'i', long = "ignorelist")]
        ignore_list: PathBuf,

        /// Unified diff file or glob to apply, or - to read one from stdin
        /// (can be specified multiple times)
        #[arg(short, long = "patch", required = true, allow_hyphen_values = true)]
        patches: Vec<String>,

        /// Write the result here instead of overwriting the ignore list
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List built-in rules
    ListRules,
}

/// Options of the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Rule-set config file (can be specified multiple times)
    #[arg(short, long = "config")]
    pub configs: Vec<PathBuf>,

    /// Directory with rule files (can be specified multiple times)
    #[arg(short, long = "rulepaths")]
    pub rule_paths: Vec<PathBuf>,

    /// Print the suppression hash after each message
    #[arg(short, long = "generatehashes")]
    pub generate_hashes: bool,

    /// Directory containing the srcml binary (default: search PATH)
    #[arg(long)]
    pub srcml: Option<PathBuf>,

    /// Check lines only, without running srcml
    #[arg(long, conflicts_with_all = ["srcml", "register_ext", "srcml_args"])]
    pub no_srcml: bool,

    /// Extension to language mapping for srcml, as EXT=LANGUAGE
    #[arg(long = "register-ext", value_name = "EXT=LANGUAGE")]
    pub register_ext: Vec<String>,

    /// Arguments for srcml, whitespace separated. Replaces the default
    /// "--position --cpp-markup-if0", so keep --position to get node positions
    #[arg(long = "srcmlargs", allow_hyphen_values = true)]
    pub srcml_args: Option<String>,

    /// Number of spaces used for tabs
    #[arg(long, default_value_t = 4)]
    pub tabs: usize,

    /// Report all warnings as errors
    #[arg(long = "Werror")]
    pub werror: bool,

    /// File with rule violations to ignore
    #[arg(short = 'i', long = "ignorelist")]
    pub ignore_list: Option<PathBuf>,

    /// Write every finding of this run to an ignore list
    #[arg(long)]
    pub generate_ignore_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Source files or globs; `**` matches nested non-hidden directories.
    /// `-` reads file names from stdin
    #[arg(required = true)]
    pub sources: Vec<String>,
}

/// Output format for findings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line per finding.
    #[default]
    Text,
    /// A single JSON document with findings and totals.
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            report(e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Check(args) => commands::check::run(&args, cli.verbose),
        Commands::UpdateIgnores {
            ignore_list,
            patches,
            output,
        } => {
            commands::update_ignores::run(&ignore_list, &patches, output.as_deref())?;
            Ok(0)
        }
        Commands::ListRules => {
            commands::list_rules::run();
            Ok(0)
        }
    }
}

/// Prints a failure on stderr, with diagnostics for setup errors.
fn report(error: anyhow::Error) {
    match error.downcast::<SetupError>() {
        Ok(setup) => eprintln!("{:?}", miette::Report::new(setup)),
        Err(other) => eprintln!("Error: {other:#}"),
    }
}
