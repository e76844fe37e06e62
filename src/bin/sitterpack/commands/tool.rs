//! `sitterpack tool` command
//!
//! Reports the toolchain a build would use.

use anyhow::Result;

use super::Session;
use crate::cli::ToolArgs;
use sitterpack::builder::compiler::Backend;
use sitterpack::builder::locator::{locate_emcc, locate_tree_sitter, LocatedTool};
use sitterpack::util::config::OptionsConfig;
use sitterpack::util::diagnostic::{self, suggestions, Diagnostic};
use sitterpack::util::process::find_executable;
use sitterpack::util::shell::{Shell, Status};

pub fn execute(session: Session, args: ToolArgs) -> Result<()> {
    let options = session.options(OptionsConfig::default())?;
    let backend = args.backend.unwrap_or(options.backend);
    let host = session.host();
    let shell = &session.shell;

    shell.note(format!("backend: {}", backend));

    match backend {
        Backend::Cli => {
            let tree_sitter = locate_tree_sitter(host.as_ref())?;
            found(shell, &tree_sitter);
        }
        Backend::Emcc => {
            // tree-sitter is optional here; it is only used for manifest repair.
            match locate_tree_sitter(host.as_ref()) {
                Ok(tree_sitter) => found(shell, &tree_sitter),
                Err(err) => shell.warn(format!("{} (manifest repair unavailable)", err)),
            }
            let emcc = locate_emcc(host.as_ref())?;
            found(shell, &emcc);
        }
    }

    let runtime = match &options.runtime_wasm {
        Some(path) => session.ctx.project_path(path),
        None => session.ctx.default_runtime_wasm(),
    };
    if runtime.is_file() {
        shell.status(Status::Info, format!("runtime at {}", runtime.display()));
    } else if !shell.is_json() {
        let diag = Diagnostic::warning(
            "web-tree-sitter runtime not found; only grammars will be delivered",
        )
        .with_location(runtime.clone())
        .with_suggestion(suggestions::INSTALL_RUNTIME);
        diagnostic::emit(&diag, shell.use_color());
    }
    Ok(())
}

fn found(shell: &Shell, tool: &LocatedTool) {
    let path = if tool.path.is_absolute() {
        tool.path.clone()
    } else {
        find_executable(&tool.path.to_string_lossy()).unwrap_or_else(|| tool.path.clone())
    };
    shell.status(
        Status::Info,
        format!("{} ({}) at {}", tool.name, tool.version_line, path.display()),
    );
}
