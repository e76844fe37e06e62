//! Getting built artifacts to the browser.
//!
//! During development artifacts are served straight from the cache
//! directory; for production they are emitted as build assets.

pub mod emit;
pub mod gate;
pub mod serve;
pub mod server;
pub mod table;

pub use emit::{emit_artifacts, AssetSink, MemorySink, OutputDir};
pub use gate::{GateGuard, ReadinessGate};
pub use serve::{ArtifactMiddleware, DevRequest, DevResponse, Middleware, Outcome, StaticFiles};
pub use server::{DevServer, RunningServer};
pub use table::{CacheEntry, ServeTable, RUNTIME_PUBLIC_NAME};
