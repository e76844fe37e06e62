//! Grammar resolution.
//!
//! Turns grammar references into [`ResolvedGrammar`]s by reading each
//! grammar's `tree-sitter.json`. Grammars that only carry the older
//! `package.json` section are repaired with `tree-sitter init --update`
//! before being read.
//!
//! Resolution is sequential and per-reference failures never abort the
//! batch.

use std::path::Path;

use crate::builder::driver::requires_interactive;
use crate::core::error::GrammarError;
use crate::core::grammar::ResolvedGrammar;
use crate::core::manifest::{has_package_section, GrammarManifest, PACKAGE_JSON, TREE_SITTER_JSON};
use crate::core::reference::GrammarReference;
use crate::host::Host;
use crate::util::process::ProcessBuilder;

/// Resolves references against a host.
pub struct Resolver<'a> {
    host: &'a dyn Host,
    /// tree-sitter executable used for repairs
    repair_tool: Option<&'a Path>,
}

/// Outcome of resolving a batch of references.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Unique by name, in first-seen order
    pub grammars: Vec<ResolvedGrammar>,
    pub failures: Vec<GrammarError>,
}

impl<'a> Resolver<'a> {
    /// `repair_tool` is the tree-sitter CLI; without it grammars lacking
    /// `tree-sitter.json` cannot be repaired.
    pub fn new(host: &'a dyn Host, repair_tool: Option<&'a Path>) -> Self {
        Resolver { host, repair_tool }
    }

    /// Resolve one reference.
    pub fn resolve(&self, reference: &GrammarReference) -> Result<ResolvedGrammar, GrammarError> {
        let base_path = reference.base_path(self.host.root());
        let manifest_path = base_path.join(TREE_SITTER_JSON);

        if !self.host.is_file(&manifest_path) {
            self.check_package_section(reference, &base_path)?;
            self.repair(reference, &base_path)?;

            if !self.host.is_file(&manifest_path) {
                return Err(GrammarError::ManifestRepairFailed {
                    reference: reference.to_string(),
                    base_path,
                });
            }
        }

        let name = self.read_name(reference, &manifest_path)?;
        tracing::debug!(reference = %reference, grammar = %name, base = %base_path.display(), "resolved");
        Ok(ResolvedGrammar::new(name, base_path, reference.clone()))
    }

    /// Resolve every reference in order.
    ///
    /// When two references resolve to the same grammar name the later one
    /// wins, keeping the position of the first.
    pub fn resolve_all(&self, references: &[GrammarReference]) -> Resolution {
        let mut resolution = Resolution::default();

        for reference in references {
            match self.resolve(reference) {
                Ok(grammar) => insert_last_wins(&mut resolution.grammars, grammar),
                Err(err) => {
                    tracing::error!(reference = %reference, "{}", err);
                    resolution.failures.push(err);
                }
            }
        }

        resolution
    }

    /// `package.json` must exist and declare a `tree-sitter` section.
    fn check_package_section(
        &self,
        reference: &GrammarReference,
        base_path: &Path,
    ) -> Result<(), GrammarError> {
        let missing = || GrammarError::ManifestMissing {
            reference: reference.to_string(),
            base_path: base_path.to_path_buf(),
        };

        let package_path = base_path.join(PACKAGE_JSON);
        if !self.host.is_file(&package_path) {
            return Err(missing());
        }

        let contents = self
            .host
            .read_to_string(&package_path)
            .map_err(|err| GrammarError::ManifestParseError {
                reference: reference.to_string(),
                path: package_path.clone(),
                message: err.to_string(),
            })?;

        match has_package_section(&contents) {
            Ok(true) => Ok(()),
            Ok(false) => Err(missing()),
            Err(err) => Err(GrammarError::ManifestParseError {
                reference: reference.to_string(),
                path: package_path,
                message: err.to_string(),
            }),
        }
    }

    /// Run `tree-sitter init --update` in the grammar directory.
    ///
    /// Exactly one captured invocation. When that fails because the tool
    /// wanted a terminal, the same command is re-run attached to the
    /// user's terminal so prompts can be answered.
    fn repair(&self, reference: &GrammarReference, base_path: &Path) -> Result<(), GrammarError> {
        let Some(tool) = self.repair_tool else {
            tracing::debug!(reference = %reference, "no tree-sitter CLI available for repair");
            return Err(GrammarError::ManifestRepairFailed {
                reference: reference.to_string(),
                base_path: base_path.to_path_buf(),
            });
        };

        let cmd = ProcessBuilder::new(tool)
            .args(["init", "--update"])
            .cwd(base_path);
        tracing::info!(reference = %reference, "`{}` missing, running `tree-sitter init --update`", TREE_SITTER_JSON);

        let output = match self.host.execute(&cmd) {
            Ok(output) => output,
            Err(err) => {
                tracing::error!(reference = %reference, "failed to run `{}`: {:#}", cmd.display_command(), err);
                return Ok(());
            }
        };

        if output.success {
            return Ok(());
        }

        if requires_interactive(&output.stderr) {
            tracing::info!(reference = %reference, "`tree-sitter init` needs a terminal, re-running interactively");
            match self.host.execute_interactive(&cmd) {
                Ok(status) if status.success => return Ok(()),
                Ok(status) => {
                    tracing::error!(reference = %reference, code = ?status.code, "interactive `tree-sitter init --update` failed");
                }
                Err(err) => {
                    tracing::error!(reference = %reference, "failed to run `{}`: {:#}", cmd.display_command(), err);
                }
            }
        } else {
            tracing::error!(reference = %reference, "{}", output.stderr.trim_end());
        }

        Ok(())
    }

    fn read_name(
        &self,
        reference: &GrammarReference,
        manifest_path: &Path,
    ) -> Result<String, GrammarError> {
        let parse_error = |message: String| GrammarError::ManifestParseError {
            reference: reference.to_string(),
            path: manifest_path.to_path_buf(),
            message,
        };

        let contents = self
            .host
            .read_to_string(manifest_path)
            .map_err(|err| parse_error(err.to_string()))?;
        let manifest = GrammarManifest::parse(&contents).map_err(|err| parse_error(err.to_string()))?;
        let name = manifest
            .primary_name()
            .map_err(|err| parse_error(err.to_string()))?;
        Ok(name.to_string())
    }
}

/// Insert keyed by name: a duplicate replaces the earlier value in place.
fn insert_last_wins(grammars: &mut Vec<ResolvedGrammar>, grammar: ResolvedGrammar) {
    match grammars.iter_mut().find(|g| g.name == grammar.name) {
        Some(existing) => {
            tracing::debug!(
                grammar = %grammar.name,
                previous = %existing.reference,
                replacement = %grammar.reference,
                "grammar listed twice, using the later reference"
            );
            *existing = grammar;
        }
        None => grammars.push(grammar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::test_support::{
        package_json, package_json_with_section, tree_sitter_json, CommandExpectation, MockHost,
        MockProcessOutput,
    };

    const TOOL: &str = "/project/node_modules/.bin/tree-sitter";

    fn resolver(host: &MockHost) -> Resolver<'_> {
        Resolver::new(host, Some(Path::new(TOOL)))
    }

    #[test]
    fn test_existing_manifest_needs_no_tool() {
        let host = MockHost::new("/project");
        host.add_file("tree-sitter-sql/tree-sitter.json", tree_sitter_json("sql"));

        let grammar = resolver(&host)
            .resolve(&GrammarReference::new("./tree-sitter-sql"))
            .unwrap();
        assert_eq!(grammar.name, "sql");
        assert_eq!(grammar.base_path, PathBuf::from("/project/tree-sitter-sql"));
        assert!(host.calls().is_empty());
        assert!(host.interactive_calls().is_empty());
    }

    #[test]
    fn test_package_reference_resolves_in_node_modules() {
        let host = MockHost::new("/project");
        host.add_file(
            "node_modules/tree-sitter-nix/tree-sitter.json",
            tree_sitter_json("nix"),
        );

        let grammar = resolver(&host)
            .resolve(&GrammarReference::new("tree-sitter-nix"))
            .unwrap();
        assert_eq!(grammar.name, "nix");
        assert_eq!(
            grammar.base_path,
            PathBuf::from("/project/node_modules/tree-sitter-nix")
        );
    }

    #[test]
    fn test_missing_everything() {
        let host = MockHost::new("/project");
        let err = resolver(&host)
            .resolve(&GrammarReference::new("./nope"))
            .unwrap_err();
        assert!(matches!(err, GrammarError::ManifestMissing { .. }));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_package_json_without_section() {
        let host = MockHost::new("/project");
        host.add_file("g/package.json", package_json("tree-sitter-g"));

        let err = resolver(&host)
            .resolve(&GrammarReference::new("./g"))
            .unwrap_err();
        assert!(matches!(err, GrammarError::ManifestMissing { .. }));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_unparseable_package_json() {
        let host = MockHost::new("/project");
        host.add_file("g/package.json", "{ \"name\": ");

        let err = resolver(&host)
            .resolve(&GrammarReference::new("./g"))
            .unwrap_err();
        assert!(matches!(err, GrammarError::ManifestParseError { .. }));
    }

    #[test]
    fn test_repair_runs_exactly_once() {
        let host = MockHost::new("/project");
        host.add_file("g/package.json", package_json_with_section("tree-sitter-g"));
        host.expect(
            CommandExpectation::exact(
                &format!("{} init --update", TOOL),
                MockProcessOutput::success("Updated tree-sitter.json"),
            )
            .times(1)
            .creates("/project/g/tree-sitter.json", tree_sitter_json("g")),
        );

        let grammar = resolver(&host).resolve(&GrammarReference::new("./g")).unwrap();
        assert_eq!(grammar.name, "g");

        let calls = host.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].process.get_cwd(), Some(Path::new("/project/g")));
        assert!(host.interactive_calls().is_empty());
        host.verify().unwrap();
    }

    #[test]
    fn test_repair_that_writes_nothing_fails() {
        let host = MockHost::new("/project");
        host.add_file("g/package.json", package_json_with_section("tree-sitter-g"));
        host.expect(CommandExpectation::contains(
            "init --update",
            MockProcessOutput::success(""),
        ));

        let err = resolver(&host).resolve(&GrammarReference::new("./g")).unwrap_err();
        assert!(matches!(err, GrammarError::ManifestRepairFailed { .. }));
        assert_eq!(host.calls().len(), 1);
    }

    #[test]
    fn test_repair_falls_back_to_terminal() {
        let host = MockHost::new("/project");
        host.add_file("g/package.json", package_json_with_section("tree-sitter-g"));
        host.expect(CommandExpectation::contains(
            "init --update",
            MockProcessOutput::failure(1, "IO error: not a terminal"),
        ));
        host.expect_interactive(
            CommandExpectation::contains("init --update", MockProcessOutput::success(""))
                .creates("/project/g/tree-sitter.json", tree_sitter_json("g")),
        );

        let grammar = resolver(&host).resolve(&GrammarReference::new("./g")).unwrap();
        assert_eq!(grammar.name, "g");
        assert_eq!(host.calls().len(), 1);
        assert_eq!(host.interactive_calls().len(), 1);
        assert_eq!(
            host.interactive_calls()[0].process.get_cwd(),
            Some(Path::new("/project/g"))
        );
    }

    #[test]
    fn test_other_repair_failures_do_not_go_interactive() {
        let host = MockHost::new("/project");
        host.add_file("g/package.json", package_json_with_section("tree-sitter-g"));
        host.expect(CommandExpectation::contains(
            "init --update",
            MockProcessOutput::failure(1, "Error: grammar.js not found"),
        ));

        let err = resolver(&host).resolve(&GrammarReference::new("./g")).unwrap_err();
        assert!(matches!(err, GrammarError::ManifestRepairFailed { .. }));
        assert!(host.interactive_calls().is_empty());
    }

    #[test]
    fn test_no_repair_tool() {
        let host = MockHost::new("/project");
        host.add_file("g/package.json", package_json_with_section("tree-sitter-g"));

        let err = Resolver::new(&host, None)
            .resolve(&GrammarReference::new("./g"))
            .unwrap_err();
        assert!(matches!(err, GrammarError::ManifestRepairFailed { .. }));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_manifest_without_name() {
        let host = MockHost::new("/project");
        host.add_file("g/tree-sitter.json", r#"{ "grammars": [{ "scope": "source.g" }] }"#);

        let err = resolver(&host).resolve(&GrammarReference::new("./g")).unwrap_err();
        match err {
            GrammarError::ManifestParseError { path, message, .. } => {
                assert_eq!(path, PathBuf::from("/project/g/tree-sitter.json"));
                assert!(message.contains("name"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_name_collision_last_wins() {
        let host = MockHost::new("/project");
        host.add_file("a/tree-sitter.json", tree_sitter_json("sql"));
        host.add_file("b/tree-sitter.json", tree_sitter_json("nix"));
        host.add_file("c/tree-sitter.json", tree_sitter_json("sql"));

        let refs: Vec<_> = ["./a", "./b", "./c"].into_iter().map(GrammarReference::new).collect();
        let resolution = resolver(&host).resolve_all(&refs);

        assert!(resolution.failures.is_empty());
        let names: Vec<_> = resolution.grammars.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["sql", "nix"]);
        assert_eq!(resolution.grammars[0].reference.as_str(), "./c");
    }

    #[test]
    fn test_failures_do_not_abort_batch() {
        let host = MockHost::new("/project");
        host.add_file("ok/tree-sitter.json", tree_sitter_json("ok"));

        let refs: Vec<_> = ["./missing", "./ok"].into_iter().map(GrammarReference::new).collect();
        let resolution = resolver(&host).resolve_all(&refs);

        assert_eq!(resolution.grammars.len(), 1);
        assert_eq!(resolution.failures.len(), 1);
        assert_eq!(resolution.failures[0].subject(), Some("./missing"));
    }
}
