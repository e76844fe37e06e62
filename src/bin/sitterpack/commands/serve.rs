//! `sitterpack serve` command
//!
//! Starts the dev server first so the page can load while grammars build;
//! artifact requests wait until the build pass is over.

use std::net::{SocketAddr, ToSocketAddrs};

use anyhow::{Context, Result};

use super::Session;
use crate::cli::ServeArgs;
use sitterpack::delivery::serve::{Middleware, StaticFiles};
use sitterpack::delivery::server::DevServer;
use sitterpack::ops::GrammarPlugin;
use sitterpack::util::config::OptionsConfig;
use sitterpack::util::shell::Status;

pub fn execute(session: Session, args: ServeArgs) -> Result<()> {
    let overrides = OptionsConfig {
        public_dir: args.public_dir.clone(),
        ..args.options.to_config(None)
    };
    let options = session.options(overrides)?;
    let grammars = session.grammars(args.grammars);
    let shell = session.shell.clone();
    let host = session.host();
    let public_dir = session.ctx.project_path(&options.public_dir);

    let plugin = GrammarPlugin::new(grammars, options, host.clone(), shell.clone())?;
    plugin.config_resolved(&args.mode);

    let mut chain: Vec<Box<dyn Middleware>> = Vec::new();
    if let Some(artifacts) = plugin.configure_server() {
        chain.push(Box::new(artifacts));
    }
    chain.push(Box::new(StaticFiles::new(public_dir, host)));

    let addr = bind_address(&args.host, args.port)?;
    let server = DevServer::bind(addr, chain)?;
    shell.status(Status::Serving, server.url());

    // Requests arriving before the first pass starts must wait for it too.
    plugin.gate().close();
    let running = server.spawn();

    let result = plugin.build_start();
    plugin.gate().open();
    result?;

    running.wait();
    Ok(())
}

fn bind_address(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("invalid address `{}:{}`", host, port))?
        .next()
        .with_context(|| format!("`{}` did not resolve to an address", host))
}
