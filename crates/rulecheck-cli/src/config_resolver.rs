//! Locating the rule-set configs for a check run.
//!
//! Paths given with `--config` are used as they are, all of them. Otherwise
//! the first existing file wins among `rulecheck.json` and `rulecheck.toml`
//! in the working directory and `config.json` in the user config directory
//! (`$RULECHECK_CONFIG_DIR`, else `~/.rulecheck`).

use std::path::{Path, PathBuf};
use tracing::debug;

const PROJECT_FILES: [&str; 2] = ["rulecheck.json", "rulecheck.toml"];
const USER_FILE: &str = "config.json";

/// Rule-set configs picked for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSets {
    /// Config files, loaded in order.
    pub paths: Vec<PathBuf>,
    /// Whether the config came from the user config directory.
    pub from_user_dir: bool,
}

/// Picks the configs to load, or `None` when there are none.
#[must_use]
pub fn locate(explicit: &[PathBuf], project_dir: &Path) -> Option<RuleSets> {
    locate_in(explicit, project_dir, user_config_dir().as_deref())
}

fn locate_in(explicit: &[PathBuf], project_dir: &Path, user_dir: Option<&Path>) -> Option<RuleSets> {
    if !explicit.is_empty() {
        return Some(RuleSets {
            paths: explicit.to_vec(),
            from_user_dir: false,
        });
    }

    let project = PROJECT_FILES.iter().map(|name| (project_dir.join(name), false));
    let user = user_dir.map(|dir| (dir.join(USER_FILE), true));
    let (path, from_user_dir) = project.chain(user).find(|(path, _)| path.is_file())?;
    debug!("Found rule-set config: {}", path.display());
    Some(RuleSets {
        paths: vec![path],
        from_user_dir,
    })
}

fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os("RULECHECK_CONFIG_DIR") {
        Some(dir) => Some(PathBuf::from(dir)),
        None => home::home_dir().map(|home| home.join(".rulecheck")),
    }
}
