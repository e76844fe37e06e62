//! `sitterpack build` command

use anyhow::Result;

use super::Session;
use crate::cli::BuildArgs;
use sitterpack::builder::events::BuildEvent;
use sitterpack::delivery::emit::OutputDir;
use sitterpack::ops::GrammarPlugin;

pub fn execute(session: Session, args: BuildArgs) -> Result<()> {
    let options = session.options(args.options.to_config(None))?;
    let grammars = session.grammars(args.grammars);
    let shell = session.shell.clone();

    let plugin = GrammarPlugin::new(grammars, options, session.host(), shell.clone())?;
    plugin.config_resolved(&args.mode);

    let report = plugin.build_start()?;

    let out_dir = session.ctx.project_path(&args.out_dir);
    let mut sink = OutputDir::new(&out_dir);
    let emitted = plugin.generate_bundle(&mut sink)?;
    for name in emitted {
        let path = out_dir.join(&name);
        shell.event(&BuildEvent::AssetEmitted { name, path });
    }

    tracing::debug!(
        built = report.built.len(),
        cached = report.cached.len(),
        failed = report.failures.len(),
        out_dir = %out_dir.display(),
        "build finished"
    );
    Ok(())
}
