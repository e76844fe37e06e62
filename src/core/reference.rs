//! Grammar references as written by the user.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::util::context::PACKAGES_DIR;
use crate::util::fs::absolutize;

/// How a reference is located on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// A path relative to the project root, or absolute.
    Local,
    /// An npm package name looked up in `node_modules`.
    Package,
}

/// A grammar reference: a local path or a package name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrammarReference {
    raw: String,
    kind: ReferenceKind,
}

const LOCAL_PREFIXES: &[&str] = &["./", "../", "/", ".\\", "..\\"];

impl GrammarReference {
    /// Classify a raw reference string.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let kind = if LOCAL_PREFIXES.iter().any(|p| raw.starts_with(p))
            || Path::new(&raw).is_absolute()
        {
            ReferenceKind::Local
        } else {
            ReferenceKind::Package
        };
        GrammarReference { raw, kind }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn is_local(&self) -> bool {
        self.kind == ReferenceKind::Local
    }

    /// Directory holding the grammar, given the project root.
    ///
    /// Local references are made absolute against `root`; packages live
    /// in `<root>/node_modules/<name>`.
    pub fn base_path(&self, root: &Path) -> PathBuf {
        match self.kind {
            ReferenceKind::Local => absolutize(root, Path::new(&self.raw)),
            ReferenceKind::Package => root.join(PACKAGES_DIR).join(&self.raw),
        }
    }
}

impl fmt::Display for GrammarReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for GrammarReference {
    fn from(raw: &str) -> Self {
        GrammarReference::new(raw)
    }
}

impl From<String> for GrammarReference {
    fn from(raw: String) -> Self {
        GrammarReference::new(raw)
    }
}
