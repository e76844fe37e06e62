//! Production asset emission.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::delivery::table::ServeTable;
use crate::host::Host;
use crate::util::fs::write_bytes;

/// Receives emitted assets.
pub trait AssetSink {
    /// Emit `bytes` as an asset named `name` (no leading slash).
    fn emit_asset(&mut self, name: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Writes assets into a directory on disk.
#[derive(Debug, Clone)]
pub struct OutputDir {
    dir: PathBuf,
}

impl OutputDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        OutputDir { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl AssetSink for OutputDir {
    fn emit_asset(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.dir.join(name);
        write_bytes(&path, &bytes)
            .with_context(|| format!("failed to write asset {}", path.display()))
    }
}

/// Collects assets in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub assets: Vec<(String, Vec<u8>)>,
}

impl AssetSink for MemorySink {
    fn emit_asset(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.assets.push((name.to_string(), bytes));
        Ok(())
    }
}

/// Asset name for a public name: the public name without its leading `/`.
pub fn asset_name(public_name: &str) -> &str {
    public_name.trim_start_matches('/')
}

/// Emit every entry of `table` into `sink`, in public-name order.
///
/// An artifact that cannot be read is logged and skipped; a sink failure
/// aborts emission. Returns the emitted asset names.
pub fn emit_artifacts(
    host: &dyn Host,
    table: &ServeTable,
    sink: &mut dyn AssetSink,
) -> Result<Vec<String>> {
    let mut emitted = Vec::new();

    for entry in table.entries() {
        let bytes = match host.read(&entry.disk_path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(
                    "skipping {}: failed to read {}: {}",
                    entry.public_name,
                    entry.disk_path.display(),
                    err
                );
                continue;
            }
        };

        let name = asset_name(&entry.public_name);
        sink.emit_asset(name, bytes)?;
        tracing::debug!(asset = name, "emitted");
        emitted.push(name.to_string());
    }

    Ok(emitted)
}
