//! Compiler backends that turn a grammar directory into a `.wasm` module.
//!
//! Two backends exist:
//! - `cli`: `tree-sitter build --wasm`, which drives emcc (or docker) itself
//! - `emcc`: invoke emcc directly with a side-module configuration

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::builder::locator::LocatedTool;
use crate::core::error::GrammarError;
use crate::core::grammar::ResolvedGrammar;
use crate::host::Host;
use crate::util::process::ProcessBuilder;

/// Which compiler produces the artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// The tree-sitter CLI
    #[default]
    Cli,
    /// emcc invoked directly
    Emcc,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cli => "cli",
            Backend::Emcc => "emcc",
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cli" | "tree-sitter" => Ok(Backend::Cli),
            "emcc" | "emscripten" => Ok(Backend::Emcc),
            _ => Err(format!("unknown backend '{}'; expected 'cli' or 'emcc'", s)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces the command that compiles one grammar.
pub trait WasmCompiler: Send + Sync {
    /// The backend this compiler implements.
    fn backend(&self) -> Backend;

    /// The located executable.
    fn tool(&self) -> &LocatedTool;

    /// Build the compile command for `grammar`, writing `output`.
    fn command(
        &self,
        host: &dyn Host,
        grammar: &ResolvedGrammar,
        output: &Path,
    ) -> Result<ProcessBuilder, GrammarError>;
}

/// `tree-sitter build --wasm --output <output> <grammar dir>`.
#[derive(Debug, Clone)]
pub struct TreeSitterCli {
    tool: LocatedTool,
    em_cache_dir: Option<PathBuf>,
}

impl TreeSitterCli {
    /// `em_cache_dir` is exported to the child as `EM_CACHE` when set.
    pub fn new(tool: LocatedTool, em_cache_dir: Option<PathBuf>) -> Self {
        TreeSitterCli { tool, em_cache_dir }
    }
}

impl WasmCompiler for TreeSitterCli {
    fn backend(&self) -> Backend {
        Backend::Cli
    }

    fn tool(&self) -> &LocatedTool {
        &self.tool
    }

    fn command(
        &self,
        host: &dyn Host,
        grammar: &ResolvedGrammar,
        output: &Path,
    ) -> Result<ProcessBuilder, GrammarError> {
        let mut cmd = ProcessBuilder::new(&self.tool.path)
            .args(["build", "--wasm", "--output"])
            .arg(output)
            .arg(&grammar.base_path);

        if let Some(ref dir) = self.em_cache_dir {
            cmd = cmd.env("EM_CACHE", host.resolve(dir));
        }

        Ok(cmd)
    }
}

/// Heap size for the side module, as configured for web-tree-sitter.
const TOTAL_MEMORY: u32 = 33_554_432;

/// emcc building a `SIDE_MODULE` that web-tree-sitter can load.
#[derive(Debug, Clone)]
pub struct Emcc {
    tool: LocatedTool,
    em_cache_dir: Option<PathBuf>,
}

impl Emcc {
    /// `em_cache_dir` is exported to the child as `EM_CACHE` when set.
    pub fn new(tool: LocatedTool, em_cache_dir: Option<PathBuf>) -> Self {
        Emcc { tool, em_cache_dir }
    }
}

/// Exported language function symbol for a grammar name.
pub fn language_symbol(name: &str) -> String {
    format!("_tree_sitter_{}", name.replace('-', "_"))
}

impl WasmCompiler for Emcc {
    fn backend(&self) -> Backend {
        Backend::Emcc
    }

    fn tool(&self) -> &LocatedTool {
        &self.tool
    }

    fn command(
        &self,
        host: &dyn Host,
        grammar: &ResolvedGrammar,
        output: &Path,
    ) -> Result<ProcessBuilder, GrammarError> {
        let src = grammar.base_path.join("src");
        let parser = src.join("parser.c");
        if !host.is_file(&parser) {
            return Err(GrammarError::BuildFailed {
                grammar: grammar.name.clone(),
                code: None,
                stderr: format!("missing generated parser: {}", parser.display()),
            });
        }

        let mut cmd = ProcessBuilder::new(&self.tool.path)
            .args(["-Os", "-fno-exceptions"])
            .args(["-s", "WASM=1"])
            .args(["-s", "SIDE_MODULE=1"])
            .arg("-s")
            .arg(format!("TOTAL_MEMORY={}", TOTAL_MEMORY))
            .args(["-s", "NODEJS_CATCH_EXIT=0"])
            .arg("-s")
            .arg(format!(
                "EXPORTED_FUNCTIONS=[\"{}\"]",
                language_symbol(&grammar.name)
            ))
            .args(["-s", "ASSERTIONS=1"])
            .arg("-o")
            .arg(output)
            .arg("-I")
            .arg(&src)
            .arg(&parser)
            // emcc misbehaves when launched with a foreign NODE in the environment.
            .env_remove("NODE");

        if let Some(ref dir) = self.em_cache_dir {
            cmd = cmd.env("EM_CACHE", host.resolve(dir));
        }

        let scanner_c = src.join("scanner.c");
        if host.is_file(&scanner_c) {
            cmd = cmd.arg(scanner_c);
        } else if let Some(scanner_cxx) = ["scanner.cc", "scanner.cpp"]
            .iter()
            .map(|file| src.join(file))
            .find(|path| host.is_file(path))
        {
            cmd = cmd.arg("-xc++").arg(scanner_cxx);
        }

        Ok(cmd)
    }
}

/// Create the compiler for `backend` around an already located tool.
pub fn compiler_for(
    backend: Backend,
    tool: LocatedTool,
    em_cache_dir: Option<PathBuf>,
) -> Box<dyn WasmCompiler> {
    match backend {
        Backend::Cli => Box::new(TreeSitterCli::new(tool, em_cache_dir)),
        Backend::Emcc => Box::new(Emcc::new(tool, em_cache_dir)),
    }
}
