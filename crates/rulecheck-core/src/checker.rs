//! Run orchestration: rule loading, file iteration and ignore-list output.

use crate::document::StructuralDocument;
use crate::engine::TraversalEngine;
use crate::ignore::{IgnoreError, IgnoreStore};
use crate::registry::{LoadOutcome, LoadReport, RuleCatalog, RuleRegistry};
use crate::rule::{RuleBox, RuleSettings};
use crate::sink::{SinkOptions, ViolationSink, ENGINE_NAME};
use crate::srcml::{SrcmlError, StructuralParser};
use crate::types::{CheckSummary, Violation};
use crate::walker::{read_document, FileWalker};

use miette::Diagnostic;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that stop a run before or after checking files.
#[derive(Debug, Error, Diagnostic)]
pub enum SetupError {
    /// The structural parser could not be set up.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Srcml(#[from] SrcmlError),

    /// The ignore list could not be read.
    #[error(transparent)]
    #[diagnostic(
        code(rulecheck::ignore_list),
        help("check the path given with --ignorelist")
    )]
    IgnoreList(#[from] IgnoreError),

    /// The generated ignore file could not be written.
    #[error("Failed to write ignore file {path}: {source}")]
    #[diagnostic(code(rulecheck::generated_ignore_file))]
    GeneratedIgnoreFile {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Builder for configuring a [`Checker`].
pub struct CheckerBuilder {
    catalog: RuleCatalog,
    configs: Vec<PathBuf>,
    rule_paths: Vec<PathBuf>,
    rules: Vec<(String, RuleSettings)>,
    instances: Vec<(String, RuleBox)>,
    parser: Option<Box<dyn StructuralParser>>,
    ignore_list: Option<PathBuf>,
    generate_ignore_file: Option<PathBuf>,
    options: SinkOptions,
}

impl CheckerBuilder {
    /// Creates a builder resolving rule identifiers against `catalog`.
    #[must_use]
    pub fn new(catalog: RuleCatalog) -> Self {
        Self {
            catalog,
            configs: Vec::new(),
            rule_paths: Vec::new(),
            rules: Vec::new(),
            instances: Vec::new(),
            parser: None,
            ignore_list: None,
            generate_ignore_file: None,
            options: SinkOptions::default(),
        }
    }

    /// Adds a rule-set configuration file.
    #[must_use]
    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.configs.push(path.into());
        self
    }

    /// Adds several rule-set configuration files.
    #[must_use]
    pub fn configs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.configs.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Adds a directory searched for pattern rule files.
    #[must_use]
    pub fn rule_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rule_paths.push(path.into());
        self
    }

    /// Loads a rule by identifier, after the configuration files.
    #[must_use]
    pub fn rule(mut self, name: impl Into<String>, settings: RuleSettings) -> Self {
        self.rules.push((name.into(), settings));
        self
    }

    /// Adds a constructed rule instance with empty settings.
    #[must_use]
    pub fn rule_instance(mut self, name: impl Into<String>, rule: RuleBox) -> Self {
        self.instances.push((name.into(), rule));
        self
    }

    /// Sets the structural parser. Without one, files are checked line by
    /// line only.
    #[must_use]
    pub fn parser(mut self, parser: impl StructuralParser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Reads suppressions from an ignore list.
    #[must_use]
    pub fn ignore_list(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignore_list = Some(path.into());
        self
    }

    /// Writes every finding of the run, suppressed or not, to an ignore list.
    #[must_use]
    pub fn generate_ignore_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.generate_ignore_file = Some(path.into());
        self
    }

    /// Tab stop width for rendered messages (default: 4).
    #[must_use]
    pub fn tab_size(mut self, tab_size: usize) -> Self {
        self.options.tab_size = tab_size;
        self
    }

    /// Appends suppression hashes to rendered findings.
    #[must_use]
    pub fn show_hash(mut self, show: bool) -> Self {
        self.options.show_hash = show;
        self
    }

    /// Reports every warning as an error.
    #[must_use]
    pub fn warnings_are_errors(mut self, enabled: bool) -> Self {
        self.options.warnings_are_errors = enabled;
        self
    }

    /// Loads the rules and ignore list and builds the checker.
    ///
    /// Rules that fail to load are reported and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the ignore list cannot be read or the generated
    /// ignore file cannot be created.
    pub fn build(self) -> Result<Checker, SetupError> {
        let mut sink = ViolationSink::new(self.options);
        if let Some(path) = &self.ignore_list {
            debug!("Ignore list specified: {}", path.display());
            sink = sink.with_baseline(IgnoreStore::load(path)?);
        }

        let generated = match self.generate_ignore_file {
            Some(destination) => {
                sink = sink.generating();
                Some(GeneratedIgnoreFile::create(destination)?)
            }
            None => None,
        };

        let mut registry = RuleRegistry::new(self.catalog);
        for path in self.rule_paths {
            registry.add_rule_path(path);
        }
        let mut report = registry.load_configs(&self.configs);
        for (name, settings) in self.rules {
            match registry.load_rule(&name, settings) {
                Ok(LoadOutcome::Loaded) => report.loaded.push(name),
                Ok(LoadOutcome::Duplicate) => report.skipped.push(name),
                Err(e) => {
                    warn!("Could not load rule: {} ({})", name, e);
                    report.failed.push(name);
                }
            }
        }
        for (name, rule) in self.instances {
            match registry.add_rule(&name, rule, RuleSettings::new()) {
                Ok(LoadOutcome::Loaded) => report.loaded.push(name),
                Ok(LoadOutcome::Duplicate) => report.skipped.push(name),
                Err(e) => {
                    warn!("Could not load rule: {} ({})", name, e);
                    report.failed.push(name);
                }
            }
        }
        info!("Loaded {} rule instances", registry.len());

        Ok(Checker {
            registry,
            sink,
            parser: self.parser,
            walker: FileWalker::new(),
            generated,
            report,
        })
    }
}

impl fmt::Debug for CheckerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckerBuilder")
            .field("configs", &self.configs)
            .field("rule_paths", &self.rule_paths)
            .field("ignore_list", &self.ignore_list)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Ignore list written next to its destination and moved into place at the
/// end of the run.
struct GeneratedIgnoreFile {
    temp: NamedTempFile,
    destination: PathBuf,
}

impl GeneratedIgnoreFile {
    fn create(destination: PathBuf) -> Result<Self, SetupError> {
        let directory = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = Builder::new()
            .prefix(".rulecheck-ignore")
            .tempfile_in(&directory)
            .map_err(|source| SetupError::GeneratedIgnoreFile {
                path: destination.clone(),
                source,
            })?;
        Ok(Self { temp, destination })
    }
}

/// Checks files with a set of loaded rules.
///
/// Use [`Checker::builder()`] to construct an instance.
pub struct Checker {
    registry: RuleRegistry,
    sink: ViolationSink,
    parser: Option<Box<dyn StructuralParser>>,
    walker: FileWalker,
    generated: Option<GeneratedIgnoreFile>,
    report: LoadReport,
}

impl Checker {
    /// Creates a new builder for configuring a checker.
    #[must_use]
    pub fn builder(catalog: RuleCatalog) -> CheckerBuilder {
        CheckerBuilder::new(catalog)
    }

    /// Loaded rules.
    #[must_use]
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// What happened while loading rules.
    #[must_use]
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Totals so far.
    #[must_use]
    pub fn summary(&self) -> CheckSummary {
        self.sink.summary()
    }

    /// Output options.
    #[must_use]
    pub fn options(&self) -> SinkOptions {
        self.sink.options()
    }

    /// Expands source arguments into file paths.
    #[must_use]
    pub fn expand_sources(&self, sources: &[String]) -> Vec<PathBuf> {
        self.walker.expand(sources)
    }

    /// Checks every file named by `sources` and returns all findings.
    pub fn check_sources(&mut self, sources: &[String]) -> Vec<Violation> {
        let files = self.expand_sources(sources);
        info!("Found {} files to check", files.len());
        files.iter().flat_map(|path| self.check_path(path)).collect()
    }

    /// Checks one file and returns its findings.
    ///
    /// A file that cannot be read produces an ERROR finding from the checker
    /// itself.
    pub fn check_path(&mut self, path: &Path) -> Vec<Violation> {
        match read_document(path, self.parser.as_deref()) {
            Ok(document) => {
                TraversalEngine::new(&mut self.registry, &mut self.sink, &document).run();
            }
            Err(e) => {
                error!("{}: {}", path.display(), e);
                let file_name = path.to_string_lossy();
                self.sink.begin_file(&file_name);
                self.sink.record_failure(
                    &file_name,
                    ENGINE_NAME,
                    "Could not open file! See stderr.",
                );
            }
        }
        self.flush_generated();
        self.sink.take_violations()
    }

    /// Checks an already loaded document and returns its findings.
    pub fn check_document(&mut self, document: &StructuralDocument) -> Vec<Violation> {
        TraversalEngine::new(&mut self.registry, &mut self.sink, document).run();
        self.flush_generated();
        self.sink.take_violations()
    }

    fn flush_generated(&mut self) {
        if let Some(generated) = &mut self.generated {
            if let Err(e) = self.sink.flush_generated(generated.temp.as_file_mut()) {
                warn!(
                    "Could not write ignore entries to {}: {}",
                    generated.destination.display(),
                    e
                );
            }
        }
    }

    /// Moves the generated ignore list into place and returns the totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated ignore file cannot be persisted.
    pub fn finish(self) -> Result<CheckSummary, SetupError> {
        let summary = self.sink.summary();
        if let Some(generated) = self.generated {
            let destination = generated.destination;
            generated
                .temp
                .persist(&destination)
                .map_err(|e| SetupError::GeneratedIgnoreFile {
                    path: destination.clone(),
                    source: e.error,
                })?;
            info!("Wrote ignore file: {}", destination.display());
        }
        Ok(summary)
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker")
            .field("registry", &self.registry)
            .field("summary", &self.sink.summary())
            .finish_non_exhaustive()
    }
}
