//! Rule loading and the set of active rule instances.

use crate::config::RuleSetConfig;
use crate::declarative::{rule_file_path, PatternRule};
use crate::rule::{RuleBox, RuleError, RuleKind, RuleOptions, RuleSettings, Subscriptions};
use std::collections::BTreeMap;
use crate::engine::panic_message;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Builds a rule instance from its settings.
pub type RuleFactory = Box<dyn Fn(&RuleSettings) -> Result<RuleBox, RuleError> + Send + Sync>;

struct CatalogEntry {
    description: String,
    factory: RuleFactory,
}

/// Rules that can be loaded by identifier without a rule file.
#[derive(Default)]
pub struct RuleCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl RuleCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule constructor under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, description: impl Into<String>, factory: F)
    where
        F: Fn(&RuleSettings) -> Result<RuleBox, RuleError> + Send + Sync + 'static,
    {
        self.entries.insert(
            name.into(),
            CatalogEntry {
                description: description.into(),
                factory: Box::new(factory),
            },
        );
    }

    /// Builder-style [`RuleCatalog::register`].
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, description: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&RuleSettings) -> Result<RuleBox, RuleError> + Send + Sync + 'static,
    {
        self.register(name, description, factory);
        self
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Constructs a rule, or `None` if `name` is not registered.
    #[must_use]
    pub fn create(&self, name: &str, settings: &RuleSettings) -> Option<Result<RuleBox, RuleError>> {
        self.entries.get(name).map(|entry| (entry.factory)(settings))
    }

    /// Identifiers and descriptions, sorted by identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.description.as_str()))
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for RuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// A loaded rule instance with its dispatch metadata.
pub struct RuleSlot {
    pub(crate) name: String,
    pub(crate) rule: RuleBox,
    settings: RuleSettings,
    kind: RuleKind,
    subscriptions: Subscriptions,
    options: RuleOptions,
    pub(crate) active: bool,
}

impl RuleSlot {
    fn new(name: String, rule: RuleBox, settings: RuleSettings) -> Self {
        let kind = rule.kind();
        let subscriptions = rule.subscriptions().restricted_to(kind);
        let options = RuleOptions {
            indentation_sensitive: rule.is_indentation_sensitive(),
            werror: settings.get_bool("werror", false),
            verbose: settings.get_bool("verbose", false),
        };
        Self {
            name,
            rule,
            settings,
            kind,
            subscriptions,
            options,
            active: true,
        }
    }

    /// Rule identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Settings this instance was built from.
    #[must_use]
    pub fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    /// Rule kind.
    #[must_use]
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Hooks the engine delivers to this instance.
    #[must_use]
    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// Whether the instance still receives events for the current file.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn options(&self) -> RuleOptions {
        self.options
    }
}

impl fmt::Debug for RuleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSlot")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("settings", &self.settings)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// What happened to one load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A new instance was added.
    Loaded,
    /// An instance with equal settings already existed.
    Duplicate,
}

/// Rule names loaded, skipped and failed by one or more load requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Newly loaded rules.
    pub loaded: Vec<String>,
    /// Rules skipped as duplicates.
    pub skipped: Vec<String>,
    /// Rules that could not be loaded.
    pub failed: Vec<String>,
}

impl LoadReport {
    /// Merges another report into this one.
    pub fn extend(&mut self, other: Self) {
        self.loaded.extend(other.loaded);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

/// Loaded rule instances, grouped by identifier in first-load order.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    catalog: RuleCatalog,
    rule_paths: Vec<PathBuf>,
    groups: Vec<(String, Vec<RuleSlot>)>,
}

impl RuleRegistry {
    /// Creates a registry resolving identifiers against `catalog`.
    #[must_use]
    pub fn new(catalog: RuleCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// The catalog identifiers are resolved against.
    #[must_use]
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Adds a directory searched for pattern rule files.
    ///
    /// Returns false, with a warning, if the directory does not exist.
    pub fn add_rule_path(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if !path.is_dir() {
            warn!("Rule path not found: {}", path.display());
            return false;
        }
        debug!("Added rule path: {}", path.display());
        self.rule_paths.push(path);
        true
    }

    /// Loads rule-set configuration files in order.
    ///
    /// Files that cannot be read or parsed are reported and skipped.
    pub fn load_configs<P: AsRef<Path>>(&mut self, paths: &[P]) -> LoadReport {
        let mut report = LoadReport::default();
        for path in paths {
            let path = path.as_ref();
            match RuleSetConfig::from_file(path) {
                Ok(config) => {
                    let loaded = self.load_rule_set(&config);
                    info!(
                        "From {} loaded {} rules",
                        path.display(),
                        loaded.loaded.len()
                    );
                    if !loaded.skipped.is_empty() {
                        info!(
                            "From {} skipped already loaded rules: {}",
                            path.display(),
                            loaded.skipped.join(", ")
                        );
                    }
                    report.extend(loaded);
                }
                Err(e) => warn!("Could not open config file: {} ({})", path.display(), e),
            }
        }
        report
    }

    /// Loads every rule of a rule set.
    pub fn load_rule_set(&mut self, config: &RuleSetConfig) -> LoadReport {
        let mut report = LoadReport::default();
        for entry in &config.rules {
            match self.load_rule(&entry.name, entry.settings.clone()) {
                Ok(LoadOutcome::Loaded) => report.loaded.push(entry.name.clone()),
                Ok(LoadOutcome::Duplicate) => report.skipped.push(entry.name.clone()),
                Err(e) => {
                    warn!("Could not load rule: {} ({})", entry.name, e);
                    report.failed.push(entry.name.clone());
                }
            }
        }
        report
    }

    /// Loads one rule instance by identifier.
    ///
    /// The catalog is consulted first, then the rule paths in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is unknown or the rule fails to
    /// construct.
    pub fn load_rule(
        &mut self,
        name: &str,
        settings: RuleSettings,
    ) -> Result<LoadOutcome, RuleError> {
        if self.has_instance(name, &settings) {
            return Ok(LoadOutcome::Duplicate);
        }
        let slot = guarded(|| {
            let rule = self.construct(name, &settings)?;
            Ok(RuleSlot::new(name.to_string(), rule, settings))
        })?;
        self.push_slot(name, slot);
        Ok(LoadOutcome::Loaded)
    }

    /// Adds an already constructed rule instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule panics while reporting its kind or
    /// subscriptions.
    pub fn add_rule(
        &mut self,
        name: &str,
        rule: RuleBox,
        settings: RuleSettings,
    ) -> Result<LoadOutcome, RuleError> {
        if self.has_instance(name, &settings) {
            return Ok(LoadOutcome::Duplicate);
        }
        let slot = guarded(|| Ok(RuleSlot::new(name.to_string(), rule, settings)))?;
        self.push_slot(name, slot);
        Ok(LoadOutcome::Loaded)
    }

    fn push_slot(&mut self, name: &str, slot: RuleSlot) {
        match self.groups.iter_mut().find(|(group, _)| group == name) {
            Some((_, slots)) => slots.push(slot),
            None => self.groups.push((name.to_string(), vec![slot])),
        }
        debug!("Loaded rule: {}", name);
    }

    fn has_instance(&self, name: &str, settings: &RuleSettings) -> bool {
        self.groups
            .iter()
            .filter(|(group, _)| group == name)
            .flat_map(|(_, slots)| slots)
            .any(|slot| slot.settings == *settings)
    }

    fn construct(&self, name: &str, settings: &RuleSettings) -> Result<RuleBox, RuleError> {
        if let Some(result) = self.catalog.create(name, settings) {
            return result;
        }
        for root in &self.rule_paths {
            let path = rule_file_path(root, name);
            if path.is_file() {
                let rule = PatternRule::from_file(&path)
                    .map_err(|e| RuleError::Failed(e.to_string()))?;
                return Ok(Box::new(rule.with_settings(settings)));
            }
        }
        Err(RuleError::UnknownRule(name.to_string()))
    }

    /// Number of loaded instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, slots)| slots.len()).sum()
    }

    /// Returns true if no rules are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Loaded identifiers in first-load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    /// Instances in dispatch order.
    pub fn slots(&self) -> impl Iterator<Item = &RuleSlot> {
        self.groups.iter().flat_map(|(_, slots)| slots.iter())
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut RuleSlot> {
        self.groups.iter_mut().flat_map(|(_, slots)| slots.iter_mut())
    }

    /// Marks every instance active for a new file.
    pub fn activate_all(&mut self) {
        for slot in self.slots_mut() {
            slot.active = true;
        }
    }
}

/// Runs rule construction, turning a panic into [`RuleError::Failed`].
fn guarded<T>(build: impl FnOnce() -> Result<T, RuleError>) -> Result<T, RuleError> {
    panic::catch_unwind(AssertUnwindSafe(build)).unwrap_or_else(|payload| {
        Err(RuleError::Failed(format!(
            "panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}
