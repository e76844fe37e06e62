//! Error kinds produced while locating tools, resolving grammars and
//! compiling them.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// A failure in the grammar build pipeline.
///
/// [`GrammarError::is_fatal`] separates errors that abort the whole batch
/// from errors that only drop one grammar.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum GrammarError {
    #[error("unable to find the `{tool}` CLI")]
    #[diagnostic(
        code(sitterpack::locate::tool_not_found),
        help("Put it on your PATH, or for tree-sitter add the npm `tree-sitter-cli` package to this project")
    )]
    ToolNotFound { tool: String, tried: Vec<String> },

    #[error("no grammars were given")]
    #[diagnostic(
        code(sitterpack::config::no_grammars),
        help("List grammar paths or package names in `sitterpack.toml` or on the command line")
    )]
    NoGrammars,

    #[error("unable to find `tree-sitter.json` for `{reference}`")]
    #[diagnostic(code(sitterpack::resolve::manifest_missing))]
    ManifestMissing { reference: String, base_path: PathBuf },

    #[error("`tree-sitter.json` for `{reference}` is still missing after `tree-sitter init --update`")]
    #[diagnostic(code(sitterpack::resolve::repair_failed))]
    ManifestRepairFailed { reference: String, base_path: PathBuf },

    #[error("unable to parse the grammar definition for `{reference}`: {message}")]
    #[diagnostic(code(sitterpack::resolve::manifest_parse))]
    ManifestParseError {
        reference: String,
        path: PathBuf,
        message: String,
    },

    #[error("`{command}` needs an interactive terminal")]
    #[diagnostic(code(sitterpack::tool::requires_interactive))]
    RequiresInteractive { reference: String, command: String },

    #[error("build failed for `{grammar}`")]
    #[diagnostic(code(sitterpack::build::failed))]
    BuildFailed {
        grammar: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{} grammar(s) failed to build: {}", failed.len(), failed.join(", "))]
    #[diagnostic(
        code(sitterpack::build::batch_failed),
        help("Strict mode fails the build when any grammar fails; see the errors above")
    )]
    BatchFailed { failed: Vec<String> },
}

impl GrammarError {
    /// Whether this error aborts the entire batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GrammarError::ToolNotFound { .. }
                | GrammarError::NoGrammars
                | GrammarError::BatchFailed { .. }
        )
    }

    /// The grammar reference or name this error is about, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            GrammarError::ToolNotFound { .. }
            | GrammarError::NoGrammars
            | GrammarError::BatchFailed { .. } => None,
            GrammarError::ManifestMissing { reference, .. }
            | GrammarError::ManifestRepairFailed { reference, .. }
            | GrammarError::ManifestParseError { reference, .. }
            | GrammarError::RequiresInteractive { reference, .. } => Some(reference),
            GrammarError::BuildFailed { grammar, .. } => Some(grammar),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            GrammarError::ToolNotFound { tried, .. } => {
                let mut diag = diag;
                for candidate in tried {
                    diag = diag.with_context(format!("tried `{}`", candidate));
                }
                diag.with_suggestion(suggestions::INSTALL_TREE_SITTER)
                    .with_suggestion(suggestions::TREE_SITTER_ON_PATH)
            }
            GrammarError::NoGrammars => diag.with_suggestion(suggestions::ADD_GRAMMARS),
            GrammarError::ManifestMissing { base_path, .. } => diag
                .with_location(base_path)
                .with_context("neither `tree-sitter.json` nor a `tree-sitter` section in `package.json` was found")
                .with_suggestion(suggestions::CHECK_REFERENCE),
            GrammarError::ManifestRepairFailed { base_path, .. } => diag
                .with_location(base_path)
                .with_suggestion(suggestions::RUN_INIT),
            GrammarError::ManifestParseError { path, message, .. } => diag
                .with_location(path)
                .with_context(message.clone()),
            GrammarError::RequiresInteractive { .. } => {
                diag.with_suggestion(suggestions::RUN_INTERACTIVE)
            }
            GrammarError::BuildFailed { code, stderr, .. } => {
                let mut diag = diag;
                if let Some(code) = code {
                    diag = diag.with_context(format!("exit code {}", code));
                }
                for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
                    diag = diag.with_context(line.to_string());
                }
                diag.with_suggestion(suggestions::BUILD_FAILED)
            }
            GrammarError::BatchFailed { .. } => diag,
        }
    }
}
