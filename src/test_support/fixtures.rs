//! Test fixtures for common grammar scenarios.

use std::path::{Path, PathBuf};

use super::{CommandExpectation, MockHost, MockProcessOutput};
use crate::host::Host;

/// Bytes of a minimal (empty) WebAssembly module.
pub const WASM_BYTES: &[u8] = b"\0asm\x01\0\0\0";

/// Version line printed by the mocked tree-sitter CLI.
pub const TREE_SITTER_VERSION: &str = "tree-sitter 0.22.6 (b40f342067a89cd6331bf4c27407588320f3c263)";

/// A `tree-sitter.json` declaring one grammar.
pub fn tree_sitter_json(name: &str) -> String {
    format!(
        r#"{{
  "grammars": [
    {{
      "name": "{name}",
      "camelcase": "{name}",
      "scope": "source.{name}",
      "path": ".",
      "file-types": ["{name}"]
    }}
  ],
  "metadata": {{
    "version": "0.1.0",
    "license": "MIT"
  }}
}}
"#
    )
}

/// A `package.json` without a `tree-sitter` section.
pub fn package_json(package: &str) -> String {
    format!(
        r#"{{
  "name": "{package}",
  "version": "0.1.0",
  "main": "bindings/node"
}}
"#
    )
}

/// A `package.json` with the older `tree-sitter` section.
pub fn package_json_with_section(package: &str) -> String {
    format!(
        r#"{{
  "name": "{package}",
  "version": "0.1.0",
  "tree-sitter": [
    {{ "scope": "source.g", "file-types": ["g"] }}
  ]
}}
"#
    )
}

/// A grammar project laid out in a [`MockHost`].
#[derive(Debug, Clone)]
pub struct GrammarFixture {
    /// Grammar name in `tree-sitter.json`
    pub name: String,
    /// Directory relative to the host root
    pub dir: PathBuf,
}

impl GrammarFixture {
    /// A local grammar at `./tree-sitter-<name>`.
    pub fn local(name: &str) -> Self {
        GrammarFixture {
            name: name.to_string(),
            dir: PathBuf::from(format!("tree-sitter-{}", name)),
        }
    }

    /// An npm package grammar at `node_modules/tree-sitter-<name>`.
    pub fn package(name: &str) -> Self {
        GrammarFixture {
            name: name.to_string(),
            dir: Path::new("node_modules").join(format!("tree-sitter-{}", name)),
        }
    }

    /// Reference string users would write for this grammar.
    pub fn reference(&self) -> String {
        match self.dir.strip_prefix("node_modules") {
            Ok(package) => package.display().to_string(),
            Err(_) => format!("./{}", self.dir.display()),
        }
    }

    /// Write `tree-sitter.json` and generated sources.
    pub fn install(&self, host: &MockHost) -> &Self {
        host.add_file(self.dir.join("tree-sitter.json"), tree_sitter_json(&self.name));
        host.add_file(self.dir.join("src/parser.c"), "/* generated */\n");
        self
    }
}

/// Install a project-local tree-sitter CLI that answers `--version`.
pub fn install_local_cli(host: &MockHost) -> PathBuf {
    let bin = host.root().join("node_modules/.bin/tree-sitter");
    host.add_file(&bin, "#!/bin/sh\n");
    host.expect(CommandExpectation::exact(
        &format!("{} --version", bin.display()),
        MockProcessOutput::success(TREE_SITTER_VERSION),
    ));
    bin
}

/// Expect a successful `tree-sitter build` for `name` that writes the artifact
/// into `<root>/<cache_dir>`.
pub fn expect_cli_build(host: &MockHost, name: &str, cache_dir: &str) -> PathBuf {
    let output = host
        .root()
        .join(cache_dir)
        .join(format!("tree-sitter-{}.wasm", name));
    host.expect(
        CommandExpectation::contains(
            &format!("build --wasm --output {}", output.display()),
            MockProcessOutput::success(""),
        )
        .creates(&output, WASM_BYTES.to_vec()),
    );
    output
}

/// Expect a failing `tree-sitter build` for `name`.
pub fn expect_failed_cli_build(host: &MockHost, name: &str, stderr: &str) {
    host.expect(CommandExpectation::contains(
        &format!("tree-sitter-{}.wasm", name),
        MockProcessOutput::failure(1, stderr),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_references() {
        assert_eq!(GrammarFixture::local("sql").reference(), "./tree-sitter-sql");
        assert_eq!(GrammarFixture::package("nix").reference(), "tree-sitter-nix");
    }

    #[test]
    fn test_install_writes_manifest() {
        let host = MockHost::new("/project");
        GrammarFixture::local("sql").install(&host);
        assert!(host.is_file(Path::new("/project/tree-sitter-sql/tree-sitter.json")));
        assert!(host.is_file(Path::new("/project/tree-sitter-sql/src/parser.c")));
    }
}
