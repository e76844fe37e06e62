//! The on-disk artifact cache.
//!
//! Artifacts are keyed only by grammar name: `<cache dir>/tree-sitter-<name>.wasm`.
//! There is no fingerprinting; an existing file is reused until it is
//! deleted or `always_rebuild` is set.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::grammar::ResolvedGrammar;
use crate::host::Host;
use crate::util::config::Options;

/// What to do with a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Reuse the artifact already on disk.
    Skip,
    /// Compile the grammar.
    Build,
}

/// Decision for one grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub action: CacheAction,
    /// Absolute artifact path
    pub output_path: PathBuf,
    /// URL path the artifact is served under
    pub public_name: String,
}

/// The artifact cache directory.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
    always_rebuild: bool,
}

impl ArtifactCache {
    /// Cache rooted at `options.wasm_cache_dir`, resolved against the host root.
    pub fn new(host: &dyn Host, options: &Options) -> Self {
        ArtifactCache {
            dir: host.resolve(&options.wasm_cache_dir),
            always_rebuild: options.always_rebuild,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory.
    ///
    /// Best-effort: an existing directory is fine, any other failure is
    /// logged and the batch continues (each build will then fail on its own).
    pub fn prepare(&self, host: &dyn Host) {
        match host.create_dir_all(&self.dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => {
                tracing::error!(
                    dir = %self.dir.display(),
                    "failed to create grammar cache directory: {}",
                    err
                );
            }
        }
    }

    /// Decide whether `grammar` needs a build.
    pub fn plan(&self, host: &dyn Host, grammar: &ResolvedGrammar) -> BuildPlan {
        let output_path = self.dir.join(grammar.artifact_file_name());
        let action = if !self.always_rebuild && host.is_file(&output_path) {
            CacheAction::Skip
        } else {
            CacheAction::Build
        };

        tracing::trace!(grammar = %grammar.name, ?action, path = %output_path.display(), "planned");

        BuildPlan {
            action,
            output_path,
            public_name: grammar.public_name(),
        }
    }
}

/// A compiled artifact found in a cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    /// Grammar name parsed from the file name
    pub grammar: String,
    pub path: PathBuf,
    pub size: u64,
}

/// List compiled artifacts in `dir`, sorted by grammar name.
///
/// A missing directory is an empty cache.
pub fn list_artifacts(dir: &Path) -> Result<Vec<CachedArtifact>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let Some(grammar) = file_name
            .strip_prefix("tree-sitter-")
            .and_then(|rest| rest.strip_suffix(".wasm"))
        else {
            continue;
        };

        let size = entry
            .metadata()
            .with_context(|| format!("failed to stat {}", entry.path().display()))?
            .len();

        artifacts.push(CachedArtifact {
            grammar: grammar.to_string(),
            path: entry.path().to_path_buf(),
            size,
        });
    }

    artifacts.sort_by(|a, b| a.grammar.cmp(&b.grammar));
    Ok(artifacts)
}
