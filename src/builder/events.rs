//! Build event types for JSON output.
//!
//! This module defines the JSON schema emitted with `--message-format json`.
//! Each event is one JSON object per line on stdout.
//!
//! # Event Types
//!
//! - `build-started`: A build-start pass began
//! - `grammar-artifact`: A grammar artifact is available (built or cached)
//! - `grammar-failed`: A grammar was dropped from the batch
//! - `asset-emitted`: An artifact was written to the build output
//! - `build-finished`: The pass completed
//! - `error`: A fatal error
//!
//! # Stability
//!
//! New fields may be added, but existing fields should not be removed or renamed.

use std::path::PathBuf;

use serde::Serialize;

/// A build event emitted during the build process.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    /// A build-start pass began.
    #[serde(rename = "build-started")]
    BuildStarted {
        /// Number of grammar references in the batch
        grammar_count: usize,
        /// Compiler backend in use
        backend: String,
    },

    /// A grammar artifact is available.
    #[serde(rename = "grammar-artifact")]
    GrammarArtifact {
        /// Grammar name from its manifest
        grammar: String,
        /// Artifact on disk
        filename: PathBuf,
        /// URL path the artifact is served under
        public_name: String,
        /// Whether the artifact was compiled in this pass (vs cached)
        fresh: bool,
    },

    /// A grammar failed to resolve or build.
    #[serde(rename = "grammar-failed")]
    GrammarFailed {
        /// Reference or grammar name
        grammar: String,
        /// Error message text
        message: String,
    },

    /// An artifact was written into the build output.
    #[serde(rename = "asset-emitted")]
    AssetEmitted {
        /// Asset name relative to the output directory
        name: String,
        /// Full output path
        path: PathBuf,
    },

    /// A build-start pass completed.
    #[serde(rename = "build-finished")]
    BuildFinished {
        /// Whether every grammar succeeded
        success: bool,
        /// Total duration in milliseconds
        duration_ms: u64,
        built: usize,
        cached: usize,
        failed: usize,
    },

    /// A fatal error.
    #[serde(rename = "error")]
    Error {
        /// Message text
        message: String,
    },
}

impl BuildEvent {
    /// Create a grammar artifact event.
    pub fn artifact(
        grammar: impl Into<String>,
        filename: impl Into<PathBuf>,
        public_name: impl Into<String>,
        fresh: bool,
    ) -> Self {
        BuildEvent::GrammarArtifact {
            grammar: grammar.into(),
            filename: filename.into(),
            public_name: public_name.into(),
            fresh,
        }
    }

    /// Create a grammar failure event.
    pub fn failed(grammar: impl Into<String>, message: impl Into<String>) -> Self {
        BuildEvent::GrammarFailed {
            grammar: grammar.into(),
            message: message.into(),
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
