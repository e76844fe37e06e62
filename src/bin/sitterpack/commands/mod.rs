//! Command implementations

pub mod build;
pub mod cache;
pub mod clean;
pub mod completions;
pub mod serve;
pub mod tool;

use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalArgs, MessageFormat};
use sitterpack::host::{Host, NativeHost};
use sitterpack::util::config::{load_config, Config, LogLevel, Options, OptionsConfig};
use sitterpack::util::shell::{ColorChoice, Shell};
use sitterpack::util::GlobalContext;

/// Project context, configuration and output shared by every command.
pub struct Session {
    pub ctx: GlobalContext,
    pub config: Config,
    pub shell: Arc<Shell>,
    cli_log_level: Option<LogLevel>,
}

impl Session {
    /// Locate the project and read its configuration.
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let ctx = GlobalContext::new()?;

        let config = load_config(ctx.global_config_path().as_deref(), ctx.manifest_path())?;
        let log_level = global
            .log_level
            .or(config.options.log_level)
            .unwrap_or_default();

        let color = if global.no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        let shell = Arc::new(Shell::from_log_level(
            log_level,
            color,
            global.message_format == MessageFormat::Json,
        ));

        Ok(Session {
            ctx,
            config,
            shell,
            cli_log_level: global.log_level,
        })
    }

    /// Effective log level: flag, then config, then default.
    pub fn log_level(&self) -> LogLevel {
        self.cli_log_level
            .or(self.config.options.log_level)
            .unwrap_or_default()
    }

    /// Config options with `overrides` applied on top.
    pub fn options(&self, mut overrides: OptionsConfig) -> Result<Options> {
        overrides.log_level = overrides.log_level.or(self.cli_log_level);
        let mut layered = self.config.options.clone();
        layered.merge(overrides);
        layered.resolve()
    }

    /// Grammars from the command line, or from the project config.
    pub fn grammars(&self, from_cli: Vec<String>) -> Vec<String> {
        if from_cli.is_empty() {
            self.config.grammars.clone()
        } else {
            from_cli
        }
    }

    /// Host rooted at the project root.
    pub fn host(&self) -> Arc<dyn Host> {
        Arc::new(NativeHost::new(self.ctx.root()))
    }
}
