//! Runtime mode of the host: development server or production build.

use std::fmt;
use std::sync::OnceLock;

/// Which delivery path is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    /// Artifacts are served over HTTP.
    Dev,
    /// Artifacts are emitted into the build output.
    Prod,
}

impl RuntimeMode {
    /// Map a host mode string. Unknown modes map to `None`.
    pub fn from_host_mode(mode: &str) -> Option<Self> {
        match mode {
            "development" => Some(RuntimeMode::Dev),
            "production" => Some(RuntimeMode::Prod),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeMode::Dev => f.write_str("development"),
            RuntimeMode::Prod => f.write_str("production"),
        }
    }
}

/// Write-once holder for the runtime mode.
///
/// The first call to [`ModeCell::set_from_host`] fixes the mode, including
/// fixing it as unset for an unknown host mode. Later calls are ignored.
#[derive(Debug, Default)]
pub struct ModeCell(OnceLock<Option<RuntimeMode>>);

impl ModeCell {
    pub fn new() -> Self {
        ModeCell(OnceLock::new())
    }

    /// Record the host mode and return the effective mode.
    pub fn set_from_host(&self, mode: &str) -> Option<RuntimeMode> {
        let parsed = RuntimeMode::from_host_mode(mode);
        if self.0.set(parsed).is_err() {
            tracing::debug!(mode, "runtime mode already set; ignoring");
        }
        self.get()
    }

    pub fn get(&self) -> Option<RuntimeMode> {
        self.0.get().copied().flatten()
    }

    pub fn is_set(&self) -> bool {
        self.0.get().is_some()
    }
}
