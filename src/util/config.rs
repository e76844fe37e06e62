//! Configuration file support for sitterpack.
//!
//! Two locations are read:
//! - Global: `<config dir>/sitterpack/config.toml` - user-wide option defaults
//! - Project: `sitterpack.toml` - grammar list and project options
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.
//!
//! ```toml
//! grammars = ["./tree-sitter-sql", "tree-sitter-nix"]
//!
//! [options]
//! always_rebuild = false
//! wasm_cache_dir = ".grammar"
//! em_build_cache_dir = ".emcache"
//! log_level = "debug"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::compiler::Backend;
use crate::util::shell::Verbosity;

/// File name of the project configuration.
pub const PROJECT_CONFIG_NAME: &str = "sitterpack.toml";

/// Default directory (relative to the project root) for compiled grammars.
pub const DEFAULT_WASM_CACHE_DIR: &str = ".grammar";

/// Default directory (relative to the project root) served as static files by `serve`.
pub const DEFAULT_PUBLIC_DIR: &str = "public";

/// Severity threshold for diagnostics.
///
/// Each level enables itself and every level above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[serde(alias = "ERROR")]
    Error,
    #[default]
    #[serde(alias = "INFO")]
    Info,
    #[serde(alias = "DEBUG")]
    Debug,
    #[serde(alias = "TRACE")]
    Trace,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Shell verbosity matching this level.
    pub fn verbosity(&self) -> Verbosity {
        match self {
            LogLevel::Error => Verbosity::Quiet,
            LogLevel::Info => Verbosity::Normal,
            LogLevel::Debug | LogLevel::Trace => Verbosity::Verbose,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "invalid log level '{}'; expected 'error', 'info', 'debug', or 'trace'",
                s
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// sitterpack configuration as read from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Grammar references, in build order
    pub grammars: Vec<String>,

    /// Build and delivery options
    pub options: OptionsConfig,
}

/// Options as they appear in a config file; unset fields fall through to
/// the next layer.
///
/// camelCase spellings are accepted so option blocks can be shared with
/// JavaScript bundler configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Rebuild every grammar even when a cached artifact exists
    #[serde(alias = "alwaysRebuild")]
    pub always_rebuild: Option<bool>,

    /// Directory holding compiled `.wasm` artifacts
    #[serde(alias = "wasmCacheDir")]
    pub wasm_cache_dir: Option<PathBuf>,

    /// Override for the compiler's internal cache (`EM_CACHE`)
    #[serde(alias = "emBuildCacheDir")]
    pub em_build_cache_dir: Option<PathBuf>,

    /// Diagnostic threshold
    #[serde(alias = "logLevel")]
    pub log_level: Option<LogLevel>,

    /// Compiler backend (cli, emcc)
    pub backend: Option<String>,

    /// Fail the build when any grammar fails
    pub strict: Option<bool>,

    /// Location of the tree-sitter runtime module served as `/tree-sitter.wasm`
    #[serde(alias = "runtimeWasm")]
    pub runtime_wasm: Option<PathBuf>,

    /// Static file root for `serve`
    #[serde(alias = "publicDir")]
    pub public_dir: Option<PathBuf>,
}

impl OptionsConfig {
    /// Merge another layer into this one (other takes precedence).
    pub fn merge(&mut self, other: OptionsConfig) {
        if other.always_rebuild.is_some() {
            self.always_rebuild = other.always_rebuild;
        }
        if other.wasm_cache_dir.is_some() {
            self.wasm_cache_dir = other.wasm_cache_dir;
        }
        if other.em_build_cache_dir.is_some() {
            self.em_build_cache_dir = other.em_build_cache_dir;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.backend.is_some() {
            self.backend = other.backend;
        }
        if other.strict.is_some() {
            self.strict = other.strict;
        }
        if other.runtime_wasm.is_some() {
            self.runtime_wasm = other.runtime_wasm;
        }
        if other.public_dir.is_some() {
            self.public_dir = other.public_dir;
        }
    }

    /// Fill in defaults and validate.
    pub fn resolve(self) -> Result<Options> {
        let backend = match self.backend {
            Some(ref b) => b
                .parse::<Backend>()
                .map_err(|e| anyhow::anyhow!("invalid backend in config: {}", e))?,
            None => Backend::default(),
        };

        Ok(Options {
            always_rebuild: self.always_rebuild.unwrap_or(false),
            wasm_cache_dir: self
                .wasm_cache_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WASM_CACHE_DIR)),
            em_build_cache_dir: self.em_build_cache_dir,
            log_level: self.log_level.unwrap_or_default(),
            backend,
            strict: self.strict.unwrap_or(false),
            runtime_wasm: self.runtime_wasm,
            public_dir: self
                .public_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLIC_DIR)),
        })
    }
}

/// Fully resolved options threaded through every build component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub always_rebuild: bool,
    pub wasm_cache_dir: PathBuf,
    pub em_build_cache_dir: Option<PathBuf>,
    pub log_level: LogLevel,
    pub backend: Backend,
    pub strict: bool,
    pub runtime_wasm: Option<PathBuf>,
    pub public_dir: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            always_rebuild: false,
            wasm_cache_dir: PathBuf::from(DEFAULT_WASM_CACHE_DIR),
            em_build_cache_dir: None,
            log_level: LogLevel::default(),
            backend: Backend::default(),
            strict: false,
            runtime_wasm: None,
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// A non-empty grammar list replaces the current one wholesale.
    pub fn merge(&mut self, other: Config) {
        if !other.grammars.is_empty() {
            self.grammars = other.grammars;
        }
        self.options.merge(other.options);
    }
}

/// Get the global sitterpack config path.
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "sitterpack", "sitterpack")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (sitterpack.toml)
/// 2. Global config
/// 3. Defaults
///
/// Missing files are skipped; a file that exists but does not parse is an
/// error.
pub fn load_config(global_path: Option<&Path>, project_path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path.filter(|p| p.exists()) {
        let mut global = Config::load(global_path)?;
        // Grammar lists are per project.
        global.grammars.clear();
        config.merge(global);
    }

    if let Some(project_path) = project_path.filter(|p| p.exists()) {
        config.merge(Config::load(project_path)?);
    }

    Ok(config)
}
