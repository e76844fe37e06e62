//! Resolved grammars and the artifact names derived from them.

use std::path::PathBuf;

use crate::core::reference::GrammarReference;

/// File name of the compiled artifact for a grammar.
pub fn artifact_file_name(name: &str) -> String {
    format!("tree-sitter-{}.wasm", name)
}

/// URL path an artifact is served under.
pub fn public_name(name: &str) -> String {
    format!("/{}", artifact_file_name(name))
}

/// A grammar whose metadata has been read.
///
/// `name` comes from the grammar's own manifest, never from the reference,
/// so two references to the same grammar produce the same artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGrammar {
    pub name: String,
    /// Absolute directory containing the grammar sources
    pub base_path: PathBuf,
    pub reference: GrammarReference,
}

impl ResolvedGrammar {
    pub fn new(name: impl Into<String>, base_path: PathBuf, reference: GrammarReference) -> Self {
        ResolvedGrammar {
            name: name.into(),
            base_path,
            reference,
        }
    }

    pub fn artifact_file_name(&self) -> String {
        artifact_file_name(&self.name)
    }

    pub fn public_name(&self) -> String {
        public_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_names() {
        let grammar = ResolvedGrammar::new(
            "sql",
            PathBuf::from("/work/tree-sitter-sql"),
            GrammarReference::new("./tree-sitter-sql"),
        );
        assert_eq!(grammar.artifact_file_name(), "tree-sitter-sql.wasm");
        assert_eq!(grammar.public_name(), "/tree-sitter-sql.wasm");
    }
}
