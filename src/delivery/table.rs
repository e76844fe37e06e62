//! The serve table: public artifact names mapped to files on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::host::Host;

/// Public name of the tree-sitter runtime module.
pub const RUNTIME_PUBLIC_NAME: &str = "/tree-sitter.wasm";

/// Where web-tree-sitter installs its runtime module, relative to the project root.
pub const DEFAULT_RUNTIME_WASM: &str = "node_modules/web-tree-sitter/tree-sitter.wasm";

/// One servable artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// URL path, always starting with `/`
    pub public_name: String,
    pub disk_path: PathBuf,
}

/// Shared map of public names to artifact paths.
///
/// Cloning is cheap and every clone sees the same entries. The table is
/// rebuilt from scratch on each build pass; an entry is only added for a
/// file that exists at registration time.
#[derive(Debug, Clone, Default)]
pub struct ServeTable {
    entries: Arc<RwLock<BTreeMap<String, PathBuf>>>,
}

impl ServeTable {
    pub fn new() -> Self {
        ServeTable::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, PathBuf>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, PathBuf>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Register `disk_path` under `public_name` if the file exists.
    ///
    /// Returns whether the entry was added.
    pub fn register(&self, host: &dyn Host, public_name: &str, disk_path: &Path) -> bool {
        if !host.is_file(disk_path) {
            tracing::debug!(public_name, path = %disk_path.display(), "not registering missing artifact");
            return false;
        }
        self.write()
            .insert(public_name.to_string(), disk_path.to_path_buf());
        tracing::trace!(public_name, path = %disk_path.display(), "registered");
        true
    }

    /// Seed the tree-sitter runtime module when it is installed.
    pub fn seed_runtime(&self, host: &dyn Host, runtime_wasm: &Path) -> bool {
        self.register(host, RUNTIME_PUBLIC_NAME, runtime_wasm)
    }

    /// Look up an exact public name.
    pub fn get(&self, public_name: &str) -> Option<PathBuf> {
        self.read().get(public_name).cloned()
    }

    /// Look up by the final segment of a URL path.
    ///
    /// `/assets/grammars/tree-sitter-sql.wasm` finds `/tree-sitter-sql.wasm`.
    pub fn lookup_path(&self, url_path: &str) -> Option<CacheEntry> {
        let segment = url_path.rsplit('/').next().filter(|s| !s.is_empty())?;
        let public_name = format!("/{}", segment);
        self.get(&public_name).map(|disk_path| CacheEntry {
            public_name,
            disk_path,
        })
    }

    pub fn contains(&self, public_name: &str) -> bool {
        self.read().contains_key(public_name)
    }

    /// Snapshot of all entries, sorted by public name.
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.read()
            .iter()
            .map(|(public_name, disk_path)| CacheEntry {
                public_name: public_name.clone(),
                disk_path: disk_path.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
