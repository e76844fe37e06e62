//! Global context for sitterpack operations.
//!
//! Provides centralized access to the project root, configuration paths and
//! well-known locations inside the project.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{global_config_path, PROJECT_CONFIG_NAME};

/// Directory holding npm packages, relative to the project root.
pub const PACKAGES_DIR: &str = "node_modules";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Project root: the directory containing `sitterpack.toml`, or cwd
    root: PathBuf,

    /// Project config file, if one was found
    manifest: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a context for the current working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context with a specific working directory.
    ///
    /// The project root is the nearest ancestor holding `sitterpack.toml`,
    /// falling back to `cwd` itself.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let manifest = find_manifest(&cwd);
        let root = manifest
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());

        GlobalContext {
            cwd,
            root,
            manifest,
        }
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project config file, if one was found.
    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    /// Get the global configuration file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        global_config_path()
    }

    /// The web-tree-sitter runtime module shipped next to the grammars.
    pub fn default_runtime_wasm(&self) -> PathBuf {
        self.root.join(crate::delivery::table::DEFAULT_RUNTIME_WASM)
    }

    /// Resolve a configured path against the project root.
    pub fn project_path(&self, path: &Path) -> PathBuf {
        crate::util::fs::absolutize(&self.root, path)
    }
}

/// Find `sitterpack.toml` starting from `start` and searching upward.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_NAME))
        .find(|candidate| candidate.is_file())
}
