//! Running a compiler for one grammar.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::builder::compiler::WasmCompiler;
use crate::core::error::GrammarError;
use crate::core::grammar::ResolvedGrammar;
use crate::host::Host;

/// Result of one compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

static INTERACTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:error:\s*)?(?:io|i/o) error").expect("interactive regex is valid")
});

/// Whether a tool's stderr suggests it wanted a terminal.
///
/// The tree-sitter CLI reports a failed prompt (no TTY on stdin) as a bare
/// I/O error. This is a best-effort prefix match on that message, not a
/// contract: other I/O failures match too, and a future CLI may word it
/// differently.
pub fn requires_interactive(stderr: &str) -> bool {
    INTERACTIVE_RE.is_match(stderr.trim_start())
}

/// Runs a [`WasmCompiler`] through a [`Host`].
pub struct BuildDriver<'a> {
    host: &'a dyn Host,
    compiler: &'a dyn WasmCompiler,
}

impl<'a> BuildDriver<'a> {
    pub fn new(host: &'a dyn Host, compiler: &'a dyn WasmCompiler) -> Self {
        BuildDriver { host, compiler }
    }

    /// Invoke the compiler once. No retry.
    ///
    /// A compiler that cannot be started is reported as a failed outcome
    /// with the spawn error as its stderr.
    pub fn build(
        &self,
        grammar: &ResolvedGrammar,
        output: &Path,
    ) -> Result<BuildOutcome, GrammarError> {
        let cmd = self.compiler.command(self.host, grammar, output)?;
        tracing::debug!(grammar = %grammar.name, command = %cmd.display_command(), "building");

        let outcome = match self.host.execute(&cmd) {
            Ok(output) => BuildOutcome {
                success: output.success,
                code: output.code,
                stderr: output.stderr,
            },
            Err(err) => BuildOutcome {
                success: false,
                code: None,
                stderr: format!("{:#}", err),
            },
        };
        Ok(outcome)
    }

    /// Build and check that the artifact was written.
    pub fn build_checked(
        &self,
        grammar: &ResolvedGrammar,
        output: &Path,
    ) -> Result<PathBuf, GrammarError> {
        let outcome = self.build(grammar, output)?;

        if !outcome.success {
            // Only manifest repair is re-run on the terminal. A build that
            // wants one is reported with its command line and not retried.
            if requires_interactive(&outcome.stderr) {
                let command = self
                    .compiler
                    .command(self.host, grammar, output)
                    .map(|cmd| cmd.display_command())
                    .unwrap_or_else(|_| self.compiler.tool().path.display().to_string());
                return Err(GrammarError::RequiresInteractive {
                    reference: grammar.reference.to_string(),
                    command,
                });
            }
            return Err(GrammarError::BuildFailed {
                grammar: grammar.name.clone(),
                code: outcome.code,
                stderr: outcome.stderr,
            });
        }

        if !self.host.is_file(output) {
            return Err(GrammarError::BuildFailed {
                grammar: grammar.name.clone(),
                code: outcome.code,
                stderr: format!(
                    "{} reported success but did not write {}",
                    self.compiler.tool().name,
                    output.display()
                ),
            });
        }

        Ok(output.to_path_buf())
    }
}
