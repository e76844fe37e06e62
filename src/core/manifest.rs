//! Grammar metadata files: `tree-sitter.json` and the `tree-sitter`
//! section of `package.json`.

use serde::Deserialize;
use thiserror::Error;

/// Grammar metadata file written by `tree-sitter init`.
pub const TREE_SITTER_JSON: &str = "tree-sitter.json";

/// npm package descriptor.
pub const PACKAGE_JSON: &str = "package.json";

/// Key in `package.json` that marks a grammar package.
pub const PACKAGE_SECTION: &str = "tree-sitter";

/// Why a grammar metadata file could not be used.
#[derive(Debug, Error)]
pub enum ManifestFormatError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`grammars` is empty")]
    NoGrammars,

    #[error("the first grammar has no `name`")]
    MissingName,

    #[error("grammar name `{0}` cannot be used as a file name")]
    InvalidName(String),
}

/// Parsed `tree-sitter.json`.
///
/// Only the fields needed to name the artifact are read; everything else
/// in the file is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarManifest {
    pub grammars: Vec<GrammarEntry>,
}

/// One entry of the `grammars` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl GrammarManifest {
    /// Parse the contents of a `tree-sitter.json` file.
    pub fn parse(contents: &str) -> Result<Self, ManifestFormatError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Name of the first grammar, which names the artifact.
    ///
    /// Multi-grammar repositories only build their first grammar.
    pub fn primary_name(&self) -> Result<&str, ManifestFormatError> {
        let entry = self.grammars.first().ok_or(ManifestFormatError::NoGrammars)?;
        let name = entry
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ManifestFormatError::MissingName)?;

        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ManifestFormatError::InvalidName(name.to_string()));
        }
        Ok(name)
    }
}

/// Check whether a `package.json` declares a non-null `tree-sitter` section.
pub fn has_package_section(contents: &str) -> Result<bool, ManifestFormatError> {
    let value: serde_json::Value = serde_json::from_str(contents)?;
    Ok(value
        .get(PACKAGE_SECTION)
        .is_some_and(|section| !section.is_null()))
}
