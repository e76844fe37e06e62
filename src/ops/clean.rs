//! Removing cached artifacts.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::util::config::Options;
use crate::util::fs::{absolutize, remove_dir_all_if_exists};

/// What `clean` should remove.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    /// Also remove the compiler's build cache, when one is configured
    pub em_cache: bool,
}

/// Remove the artifact cache below `root`.
///
/// Returns the directories that existed and were removed.
pub fn clean(root: &Path, options: &Options, clean: CleanOptions) -> Result<Vec<PathBuf>> {
    let mut dirs = vec![absolutize(root, &options.wasm_cache_dir)];
    if clean.em_cache {
        if let Some(dir) = &options.em_build_cache_dir {
            dirs.push(absolutize(root, dir));
        }
    }

    let mut removed = Vec::new();
    for dir in dirs {
        if !dir.exists() {
            continue;
        }
        remove_dir_all_if_exists(&dir)?;
        tracing::debug!(dir = %dir.display(), "removed");
        removed.push(dir);
    }
    Ok(removed)
}
