//! Core data structures for sitterpack.
//!
//! - Grammar references and the grammars they resolve to
//! - Grammar metadata files
//! - Runtime mode
//! - The error type shared by the build pipeline

pub mod error;
pub mod grammar;
pub mod manifest;
pub mod mode;
pub mod reference;

pub use error::GrammarError;
pub use grammar::ResolvedGrammar;
pub use manifest::GrammarManifest;
pub use mode::{ModeCell, RuntimeMode};
pub use reference::{GrammarReference, ReferenceKind};
