use std::fs;
use std::path::Path;

use tempfile::TempDir;

use super::SandboxError;

const SCRATCH_PREFIX: &str = "sandbox";

/// Exclusively owned scratch directory, removed when dropped
///
/// Removal failures are logged and otherwise ignored.
pub struct ScratchDir {
    dir: Option<TempDir>,
}

impl ScratchDir {
    /// Creates a fresh directory under `root`, or the system temp directory
    pub fn create(root: Option<&Path>) -> Result<Self, SandboxError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|source| SandboxError::ScratchDir { source })?;

        log::debug!("Created scratch directory {}", dir.path().display());
        Ok(Self { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        // Only `drop` takes the directory out
        self.dir.as_ref().map_or(Path::new(""), |d| d.path())
    }

    /// Writes `contents` to `name` inside the directory
    pub fn write(&self, name: &str, contents: &str) -> Result<(), SandboxError> {
        fs::write(self.path().join(name), contents).map_err(|source| SandboxError::SourceFile {
            name: name.to_string(),
            source,
        })
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                log::warn!("Failed to remove scratch directory {}: {e}", path.display());
            }
        }
    }
}
