//! Building grammars into WebAssembly.
//!
//! Tool location, cache decisions, compiler backends and the driver that
//! runs them.

pub mod cache;
pub mod compiler;
pub mod driver;
pub mod events;
pub mod locator;

pub use cache::{ArtifactCache, BuildPlan, CacheAction};
pub use compiler::{Backend, WasmCompiler};
pub use driver::{BuildDriver, BuildOutcome};
pub use events::BuildEvent;
pub use locator::LocatedTool;
