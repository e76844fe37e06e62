//! Finding the external tools grammars are built with.
//!
//! Candidates are probed in order with `--version`; the first one that
//! exits zero and prints something wins.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::core::error::GrammarError;
use crate::host::Host;
use crate::util::context::PACKAGES_DIR;
use crate::util::process::ProcessBuilder;

/// Name of the tree-sitter CLI executable.
pub const TREE_SITTER: &str = "tree-sitter";

/// Name of the Emscripten compiler driver.
pub const EMCC: &str = "emcc";

/// Environment variable overriding the emcc location.
pub const EMCC_ENV: &str = "EMCC";

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)\b").expect("version regex is valid")
});

/// A tool that answered its version probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedTool {
    /// Name the tool is known by (`tree-sitter`, `emcc`)
    pub name: String,
    /// Path or bare command that was probed
    pub path: PathBuf,
    /// First line printed by `--version`
    pub version_line: String,
    /// Semantic version found in the version line, if any
    pub version: Option<Version>,
}

impl LocatedTool {
    /// Short description for status output.
    pub fn describe(&self) -> String {
        match &self.version {
            Some(version) => format!("{} {} ({})", self.name, version, self.path.display()),
            None => format!("{} ({})", self.path.display(), self.version_line),
        }
    }
}

/// Candidate locations for the tree-sitter CLI, in probe order.
///
/// The project-local npm install comes first so a pinned
/// `tree-sitter-cli` dependency wins over a global install.
pub fn tree_sitter_candidates(root: &Path) -> Vec<PathBuf> {
    let local = if cfg!(windows) {
        format!("{}.cmd", TREE_SITTER)
    } else {
        TREE_SITTER.to_string()
    };

    vec![
        root.join(PACKAGES_DIR).join(".bin").join(local),
        PathBuf::from(TREE_SITTER),
    ]
}

/// Candidate locations for emcc: the override first, then the search path.
pub fn emcc_candidates(env_override: Option<PathBuf>) -> Vec<PathBuf> {
    env_override
        .into_iter()
        .chain(std::iter::once(PathBuf::from(EMCC)))
        .collect()
}

/// Probe `candidates` in order and return the first working tool.
pub fn locate(
    host: &dyn Host,
    tool: &str,
    candidates: &[PathBuf],
) -> Result<LocatedTool, GrammarError> {
    for candidate in candidates {
        // Absolute candidates that are not on disk are not worth a spawn.
        if candidate.is_absolute() && !host.exists(candidate) {
            tracing::trace!(candidate = %candidate.display(), "tool candidate missing");
            continue;
        }

        let probe = ProcessBuilder::new(candidate).arg("--version");
        match host.execute(&probe) {
            Ok(output) if output.success => {
                if let Some(line) = output.first_line() {
                    let located = LocatedTool {
                        name: tool.to_string(),
                        path: candidate.clone(),
                        version_line: line.to_string(),
                        version: parse_version(line),
                    };
                    tracing::debug!(tool, path = %candidate.display(), version = line, "located tool");
                    return Ok(located);
                }
                tracing::debug!(candidate = %candidate.display(), "version probe printed nothing");
            }
            Ok(output) => {
                tracing::debug!(
                    candidate = %candidate.display(),
                    code = ?output.code,
                    "version probe failed"
                );
            }
            Err(err) => {
                tracing::debug!(candidate = %candidate.display(), "version probe did not start: {:#}", err);
            }
        }
    }

    Err(GrammarError::ToolNotFound {
        tool: tool.to_string(),
        tried: candidates.iter().map(|c| c.display().to_string()).collect(),
    })
}

/// Locate the tree-sitter CLI for the project at the host root.
pub fn locate_tree_sitter(host: &dyn Host) -> Result<LocatedTool, GrammarError> {
    locate(host, TREE_SITTER, &tree_sitter_candidates(host.root()))
}

/// Locate emcc, honouring the `EMCC` environment variable.
pub fn locate_emcc(host: &dyn Host) -> Result<LocatedTool, GrammarError> {
    let env_override = host
        .env_var(EMCC_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    locate(host, EMCC, &emcc_candidates(env_override))
}

/// Extract a semantic version from a `--version` line.
pub fn parse_version(line: &str) -> Option<Version> {
    VERSION_RE
        .captures(line)
        .and_then(|caps| Version::parse(&caps[1]).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CommandExpectation, MockHost, MockProcessOutput};

    #[test]
    fn test_parse_version() {
        assert_eq!(
            parse_version("tree-sitter 0.22.6 (b40f342067a89cd6331bf4c27407588320f3c263)"),
            Some(Version::new(0, 22, 6))
        );
        assert_eq!(
            parse_version("emcc (Emscripten gcc/clang-like replacement + linker emulating GNU ld) 3.1.64 (fd61bacaf40131f74987e649a135f1dd559aff60)"),
            Some(Version::new(3, 1, 64))
        );
        assert_eq!(parse_version("tree-sitter dev"), None);
    }

    #[test]
    fn test_local_install_wins() {
        let host = MockHost::new("/project");
        host.add_file("node_modules/.bin/tree-sitter", "#!/bin/sh");
        host.expect(CommandExpectation::contains(
            "node_modules/.bin/tree-sitter --version",
            MockProcessOutput::success("tree-sitter 0.22.6\n"),
        ));

        let tool = locate_tree_sitter(&host).unwrap();
        assert_eq!(tool.path, PathBuf::from("/project/node_modules/.bin/tree-sitter"));
        assert_eq!(tool.version, Some(Version::new(0, 22, 6)));
        assert_eq!(host.calls().len(), 1);
    }

    #[test]
    fn test_falls_back_to_search_path() {
        let host = MockHost::new("/project");
        host.expect(CommandExpectation::exact(
            "tree-sitter --version",
            MockProcessOutput::success("tree-sitter 0.24.3"),
        ));

        let tool = locate_tree_sitter(&host).unwrap();
        assert_eq!(tool.path, PathBuf::from("tree-sitter"));
        assert_eq!(tool.version_line, "tree-sitter 0.24.3");
    }

    #[test]
    fn test_failing_or_silent_candidates_are_skipped() {
        let host = MockHost::new("/project");
        host.add_file("node_modules/.bin/tree-sitter", "");
        host.expect(CommandExpectation::contains(
            "node_modules/.bin/tree-sitter --version",
            MockProcessOutput::failure(127, "node: not found"),
        ));
        host.expect(CommandExpectation::exact(
            "tree-sitter --version",
            MockProcessOutput::success(""),
        ));

        let err = locate_tree_sitter(&host).unwrap_err();
        assert!(err.is_fatal());
        match err {
            GrammarError::ToolNotFound { tool, tried } => {
                assert_eq!(tool, "tree-sitter");
                assert_eq!(tried.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_locate_emcc_uses_host_override() {
        let host = MockHost::new("/project");
        host.set_env(EMCC_ENV, "/opt/emsdk/emcc");
        host.expect(CommandExpectation::exact(
            "/opt/emsdk/emcc --version",
            MockProcessOutput::success("emcc (Emscripten) 3.1.64\n"),
        ));

        let tool = locate_emcc(&host).unwrap();
        assert_eq!(tool.path, PathBuf::from("/opt/emsdk/emcc"));
        assert_eq!(tool.version, Some(Version::new(3, 1, 64)));
        assert_eq!(host.count_calls("--version"), 1);
    }

    #[test]
    fn test_emcc_override_first() {
        let candidates = emcc_candidates(Some(PathBuf::from("/opt/emsdk/upstream/emscripten/emcc")));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/opt/emsdk/upstream/emscripten/emcc"),
                PathBuf::from("emcc")
            ]
        );
        assert_eq!(emcc_candidates(None), vec![PathBuf::from("emcc")]);
    }
}
