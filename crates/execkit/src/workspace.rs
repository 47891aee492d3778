//! Ephemeral scratch directories.
//!
//! A [`Workspace`] owns a temporary directory for the lifetime of one
//! orchestration run. Files are written under fixed, predictable names so a
//! failed run can be inspected while it is still alive. The directory is
//! removed by [`Workspace::cleanup`] or, failing that, when the value drops.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Owned scratch directory for a single run.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a new workspace under the system temp directory.
    pub fn new(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|e| Error::workspace(std::env::temp_dir(), e))?;
        log::debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Create a new workspace under `parent`.
    pub fn new_in(parent: &Path, prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent)
            .map_err(|e| Error::workspace(parent, e))?;
        log::debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Root of the workspace.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path a file named `name` has (or would have) inside the workspace.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `contents` to `name`, returning the full path.
    ///
    /// Files are created owner-only on unix since they hold key material.
    pub fn write_file(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.path_of(name);
        fs::write(&path, contents).map_err(|e| Error::workspace(&path, e))?;
        restrict_permissions(&path)?;
        log::debug!("Wrote {} ({} bytes)", path.display(), contents.len());
        Ok(path)
    }

    /// Read `name`, or `None` when it was never written.
    pub fn read_file(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_of(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::workspace(&path, e)),
        }
    }

    /// Remove the directory now, reporting failure.
    pub fn cleanup(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| Error::workspace(&path, e))?;
        log::debug!("Removed workspace {}", path.display());
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| Error::workspace(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
