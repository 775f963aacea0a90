//! Update-ignores command implementation.

use anyhow::{bail, Context, Result};
use rulecheck_core::ignore::patch::PatchSet;
use rulecheck_core::{FileWalker, IgnoreStore, STDIN_SOURCE};
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info};

/// Shifts the entries of `ignore_list` through every patch and writes the
/// result to `output`, or back to `ignore_list`.
///
/// A patch argument is a file, a glob, or `-` for a diff on stdin.
pub fn run(ignore_list: &Path, patches: &[String], output: Option<&Path>) -> Result<()> {
    let mut store = IgnoreStore::load(ignore_list)
        .with_context(|| format!("Failed to load ignore list: {}", ignore_list.display()))?;

    let mut moved = 0;
    for patch in read_patches(patches)? {
        moved += patch.apply(&mut store);
    }

    let destination = output.unwrap_or(ignore_list);
    store
        .save(destination)
        .with_context(|| format!("Failed to write ignore list: {}", destination.display()))?;
    info!(
        "Moved {} ignore entries, wrote {}",
        moved,
        destination.display()
    );
    Ok(())
}

fn read_patches(sources: &[String]) -> Result<Vec<PatchSet>> {
    let walker = FileWalker::new();
    let mut patches = Vec::new();
    for source in sources {
        if source == STDIN_SOURCE {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read patch from stdin")?;
            patches.push(PatchSet::parse(&text).context("Failed to parse patch from stdin")?);
            continue;
        }

        let paths = walker.expand_with(std::slice::from_ref(source), io::empty());
        if paths.is_empty() {
            bail!("No patch files matched: {source}");
        }
        for path in paths {
            debug!("Reading patch: {}", path.display());
            patches.push(
                PatchSet::load(&path)
                    .with_context(|| format!("Failed to read patch: {}", path.display()))?,
            );
        }
    }
    Ok(patches)
}
