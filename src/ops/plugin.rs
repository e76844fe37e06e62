//! The bundler-facing lifecycle of grammar builds.
//!
//! A host drives [`GrammarPlugin`] through `config_resolved`, then
//! `build_start`, then either `configure_server` (development) or
//! `generate_bundle` (production). The serve table and readiness gate are
//! owned here and shared with the dev middleware.

use std::sync::Arc;

use anyhow::Result;

use crate::core::error::GrammarError;
use crate::core::mode::{ModeCell, RuntimeMode};
use crate::core::reference::GrammarReference;
use crate::delivery::emit::{emit_artifacts, AssetSink};
use crate::delivery::gate::ReadinessGate;
use crate::delivery::serve::ArtifactMiddleware;
use crate::delivery::table::ServeTable;
use crate::host::Host;
use crate::ops::grammar_build::{build_grammars, BuildReport, BuildRequest};
use crate::util::config::Options;
use crate::util::diagnostic;
use crate::util::shell::{Shell, Status};

/// Grammar build plugin instance.
pub struct GrammarPlugin {
    references: Vec<GrammarReference>,
    options: Options,
    host: Arc<dyn Host>,
    shell: Arc<Shell>,
    table: ServeTable,
    gate: ReadinessGate,
    mode: ModeCell,
}

impl GrammarPlugin {
    pub const NAME: &'static str = "sitterpack";

    /// Create a plugin for `references`. At least one reference is required.
    pub fn new(
        references: Vec<String>,
        options: Options,
        host: Arc<dyn Host>,
        shell: Arc<Shell>,
    ) -> Result<Self, GrammarError> {
        if references.is_empty() {
            return Err(GrammarError::NoGrammars);
        }

        Ok(GrammarPlugin {
            references: references.into_iter().map(GrammarReference::new).collect(),
            options,
            host,
            shell,
            table: ServeTable::new(),
            gate: ReadinessGate::new(),
            mode: ModeCell::new(),
        })
    }

    pub fn references(&self) -> &[GrammarReference] {
        &self.references
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn serve_table(&self) -> &ServeTable {
        &self.table
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    /// Runtime mode, if the host reported a recognized one.
    pub fn mode(&self) -> Option<RuntimeMode> {
        self.mode.get()
    }

    /// The host resolved its configuration. Only the first call counts.
    ///
    /// `"development"` and `"production"` are recognized; any other mode
    /// leaves delivery disabled, though grammars are still built.
    pub fn config_resolved(&self, host_mode: &str) -> Option<RuntimeMode> {
        let mode = self.mode.set_from_host(host_mode);
        match mode {
            Some(mode) => tracing::debug!(%mode, "runtime mode"),
            None => tracing::info!(
                host_mode,
                "unrecognized mode; grammars will be built but not served or emitted"
            ),
        }
        mode
    }

    /// Build every grammar and refill the serve table.
    ///
    /// Dev requests are held until the pass is over. Failures are reported
    /// and swallowed unless `strict` is set.
    pub fn build_start(&self) -> Result<BuildReport, GrammarError> {
        let _held = self.gate.hold();

        let report = build_grammars(
            &BuildRequest {
                host: self.host.as_ref(),
                options: &self.options,
                shell: &self.shell,
                table: &self.table,
            },
            &self.references,
        );

        if self.options.strict {
            return report.into_strict();
        }

        if let Some(fatal) = &report.fatal {
            if self.shell.is_json() {
                self.shell.error(fatal);
            } else {
                diagnostic::emit(&fatal.to_diagnostic(), self.shell.use_color());
            }
        }
        Ok(report)
    }

    /// Middleware serving artifacts, in development mode only.
    pub fn configure_server(&self) -> Option<ArtifactMiddleware> {
        if self.mode() != Some(RuntimeMode::Dev) {
            tracing::debug!("not in development mode; artifacts are not served");
            return None;
        }

        Some(ArtifactMiddleware::new(
            self.table.clone(),
            self.gate.clone(),
            Arc::clone(&self.host),
        ))
    }

    /// Emit every served artifact into `sink`, in production mode only.
    ///
    /// Returns the emitted asset names.
    pub fn generate_bundle(&self, sink: &mut dyn AssetSink) -> Result<Vec<String>> {
        if self.mode() != Some(RuntimeMode::Prod) {
            tracing::debug!("not in production mode; nothing to emit");
            return Ok(Vec::new());
        }

        let emitted = emit_artifacts(self.host.as_ref(), &self.table, sink)?;
        for name in &emitted {
            self.shell.status(Status::Emitted, name);
        }
        Ok(emitted)
    }
}
