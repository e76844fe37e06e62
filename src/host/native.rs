//! Host implementation backed by `std::fs` and `std::process`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Host, OpenFile};
use crate::util::process::{ProcessBuilder, ProcessOutput, ProcessStatus};

/// The local machine, rooted at a project directory.
#[derive(Debug, Clone)]
pub struct NativeHost {
    root: PathBuf,
}

impl NativeHost {
    /// Create a host rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        NativeHost { root: root.into() }
    }

    /// Processes without an explicit working directory run in the root.
    fn rooted(&self, cmd: &ProcessBuilder) -> ProcessBuilder {
        if cmd.get_cwd().is_some() {
            cmd.clone()
        } else {
            cmd.clone().cwd(&self.root)
        }
    }
}

impl Host for NativeHost {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.resolve(path).is_file()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(self.resolve(path))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(self.resolve(path))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    fn open(&self, path: &Path) -> io::Result<OpenFile> {
        let file = File::open(self.resolve(path))?;
        let len = file.metadata()?.len();
        Ok(OpenFile {
            reader: Box::new(file),
            len,
        })
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn execute(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        let cmd = self.rooted(cmd);
        tracing::trace!(command = %cmd.display_command(), "execute");
        let output = cmd.exec()?;
        tracing::trace!(success = output.success, code = ?output.code, "execute finished");
        Ok(output)
    }

    fn execute_interactive(&self, cmd: &ProcessBuilder) -> Result<ProcessStatus> {
        let cmd = self.rooted(cmd);
        tracing::trace!(command = %cmd.display_command(), "execute interactive");
        cmd.exec_interactive()
    }
}
