//! `sitterpack clean` command

use anyhow::Result;

use super::Session;
use crate::cli::CleanArgs;
use sitterpack::ops::{clean, CleanOptions};
use sitterpack::util::config::OptionsConfig;
use sitterpack::util::shell::Status;

pub fn execute(session: Session, args: CleanArgs) -> Result<()> {
    let options = session.options(OptionsConfig::default())?;
    let removed = clean(
        session.ctx.root(),
        &options,
        CleanOptions {
            em_cache: args.em_cache,
        },
    )?;

    if removed.is_empty() {
        session.shell.note("nothing to clean");
    }
    for dir in removed {
        session.shell.status(Status::Removed, dir.display());
    }
    Ok(())
}
