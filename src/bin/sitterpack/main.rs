//! sitterpack CLI - build tree-sitter grammars to WebAssembly

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Session;
use sitterpack::core::GrammarError;
use sitterpack::util::diagnostic;

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<GrammarError>() {
            Some(err) => diagnostic::emit(&err.to_diagnostic(), false),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Completions need no project.
    let command = match cli.command {
        Commands::Completions(args) => return commands::completions::execute(args),
        command => command,
    };

    let session = Session::load(&cli.global)?;

    let filter = EnvFilter::new(format!("sitterpack={}", session.log_level().as_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.global.no_color)
        .with_target(false)
        .without_time()
        .init();

    match command {
        Commands::Build(args) => commands::build::execute(session, args),
        Commands::Serve(args) => commands::serve::execute(session, args),
        Commands::Clean(args) => commands::clean::execute(session, args),
        Commands::Tool(args) => commands::tool::execute(session, args),
        Commands::Cache(args) => commands::cache::execute(session, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
