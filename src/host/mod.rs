//! Environment capabilities.
//!
//! Every filesystem and process operation the build pipeline performs goes
//! through [`Host`]. The concrete implementation is chosen once, at startup,
//! and handed to the pipeline; nothing below this layer sniffs the runtime.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::util::fs::absolutize;
use crate::util::process::{ProcessBuilder, ProcessOutput, ProcessStatus};

mod native;

pub use native::NativeHost;

/// A readable file handle together with its length in bytes.
pub struct OpenFile {
    pub reader: Box<dyn Read + Send>,
    pub len: u64,
}

/// Filesystem and process capabilities needed by the build pipeline.
pub trait Host: Send + Sync {
    /// Directory that relative paths are resolved against.
    fn root(&self) -> &Path;

    /// Resolve a path to an absolute path without touching the filesystem.
    fn resolve(&self, path: &Path) -> PathBuf {
        absolutize(self.root(), path)
    }

    /// Check whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Check whether `path` is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Create a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Read a UTF-8 file.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Read a file's bytes.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Open a file for streaming.
    fn open(&self, path: &Path) -> io::Result<OpenFile>;

    /// Value of an environment variable, if set and valid UTF-8.
    fn env_var(&self, name: &str) -> Option<String>;

    /// Run a process to completion, capturing its output.
    ///
    /// A process that ran and exited non-zero is `Ok` with
    /// `success == false`; `Err` means it could not be started at all.
    fn execute(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput>;

    /// Run a process attached to the user's terminal.
    fn execute_interactive(&self, cmd: &ProcessBuilder) -> Result<ProcessStatus>;
}
