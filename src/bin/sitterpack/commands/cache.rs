//! `sitterpack cache` command

use anyhow::Result;

use super::Session;
use crate::cli::{CacheArgs, CacheCommands};
use sitterpack::builder::cache::list_artifacts;
use sitterpack::util::config::OptionsConfig;

pub fn execute(session: Session, args: CacheArgs) -> Result<()> {
    let options = session.options(OptionsConfig::default())?;
    let dir = session.ctx.project_path(&options.wasm_cache_dir);

    match args.command {
        CacheCommands::Path => {
            println!("{}", dir.display());
        }
        CacheCommands::List => {
            let artifacts = list_artifacts(&dir)?;
            if artifacts.is_empty() {
                println!("no compiled grammars in {}", dir.display());
                return Ok(());
            }

            let width = artifacts.iter().map(|a| a.grammar.len()).max().unwrap_or(0);
            for artifact in &artifacts {
                println!(
                    "{:<width$}  {:>10}  {}",
                    artifact.grammar,
                    format_size(artifact.size),
                    artifact.path.display(),
                    width = width
                );
            }
        }
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
