//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use sitterpack::builder::compiler::Backend;
use sitterpack::util::config::{LogLevel, OptionsConfig};

/// sitterpack - build tree-sitter grammars to WebAssembly and serve them
#[derive(Parser)]
#[command(name = "sitterpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Diagnostic level: error, info, debug or trace
    #[arg(long, global = true, env = "SITTERPACK_LOG")]
    pub log_level: Option<LogLevel>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Output format for build progress
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build grammars and emit them into an output directory
    Build(BuildArgs),

    /// Build grammars and serve them from a development server
    Serve(ServeArgs),

    /// Remove compiled grammars
    Clean(CleanArgs),

    /// Show which grammar toolchain would be used
    Tool(ToolArgs),

    /// Inspect the grammar cache
    Cache(CacheArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by `build` and `serve`.
#[derive(Args, Default)]
pub struct OptionArgs {
    /// Rebuild every grammar, ignoring cached artifacts
    #[arg(long)]
    pub always_rebuild: bool,

    /// Directory for compiled grammars
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Emscripten cache directory passed to the compiler as EM_CACHE
    #[arg(long, value_name = "DIR")]
    pub em_cache_dir: Option<PathBuf>,

    /// Compiler backend: cli (tree-sitter build) or emcc
    #[arg(long)]
    pub backend: Option<Backend>,

    /// Fail when any grammar fails to build
    #[arg(long)]
    pub strict: bool,

    /// Path to web-tree-sitter's tree-sitter.wasm
    #[arg(long, value_name = "FILE")]
    pub runtime_wasm: Option<PathBuf>,
}

impl OptionArgs {
    /// Flags as a configuration layer; unset flags leave config values alone.
    pub fn to_config(&self, log_level: Option<LogLevel>) -> OptionsConfig {
        OptionsConfig {
            always_rebuild: self.always_rebuild.then_some(true),
            wasm_cache_dir: self.cache_dir.clone(),
            em_build_cache_dir: self.em_cache_dir.clone(),
            log_level,
            backend: self.backend.map(|b| b.as_str().to_string()),
            strict: self.strict.then_some(true),
            runtime_wasm: self.runtime_wasm.clone(),
            public_dir: None,
        }
    }
}

#[derive(Args)]
pub struct BuildArgs {
    /// Grammar paths or package names (defaults to `grammars` in sitterpack.toml)
    pub grammars: Vec<String>,

    /// Directory to emit grammar assets into
    #[arg(short, long, default_value = "dist", value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Mode reported to the grammar plugin
    #[arg(long, default_value = "production")]
    pub mode: String,

    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Grammar paths or package names (defaults to `grammars` in sitterpack.toml)
    pub grammars: Vec<String>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, default_value_t = 5173)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory served as static files
    #[arg(long, value_name = "DIR")]
    pub public_dir: Option<PathBuf>,

    /// Mode reported to the grammar plugin
    #[arg(long, default_value = "development")]
    pub mode: String,

    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Also remove the Emscripten cache, if one is configured
    #[arg(long)]
    pub em_cache: bool,
}

#[derive(Args)]
pub struct ToolArgs {
    /// Backend to check (defaults to the configured one)
    #[arg(long)]
    pub backend: Option<Backend>,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// List compiled grammars
    List,

    /// Print the cache directory
    Path,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
