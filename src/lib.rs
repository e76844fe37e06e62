//! sitterpack - builds tree-sitter grammars to WebAssembly and delivers them
//! to web applications.
//!
//! This crate provides the library side of sitterpack: tool location,
//! grammar resolution, the artifact cache, compiler drivers, and the dev
//! and production delivery paths.

pub mod builder;
pub mod core;
pub mod delivery;
pub mod host;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities and mocks for sitterpack unit tests.
///
/// Only compiled for tests. Provides an in-memory [`host::Host`] with
/// scripted process results, plus grammar fixtures.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{GrammarError, GrammarReference, ResolvedGrammar, RuntimeMode};
pub use delivery::{ArtifactMiddleware, DevServer, ServeTable};
pub use host::{Host, NativeHost};
pub use ops::{BuildReport, GrammarPlugin};
pub use util::context::GlobalContext;
