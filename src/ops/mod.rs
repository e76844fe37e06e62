//! High-level operations.
//!
//! The build pass, the plugin lifecycle that wraps it, and cache cleanup.

pub mod clean;
pub mod grammar_build;
pub mod plugin;

pub use clean::{clean, CleanOptions};
pub use grammar_build::{build_grammars, ArtifactRecord, BuildReport, BuildRequest};
pub use plugin::GrammarPlugin;
