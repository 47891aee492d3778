//! Persistent deployment config and named assets.
//!
//! Layout under the state directory:
//!
//! ```text
//! <state_dir>/<project>/config.toml
//! <state_dir>/<project>/assets/<key>
//! <state_dir>/<project>/terraform.tfstate
//! ```

use crate::config::Config;
use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
const ASSETS_DIR: &str = "assets";
const TERRAFORM_STATE_FILENAME: &str = "terraform.tfstate";

/// Storage for one deployment's config and assets.
pub trait ConfigStore {
    /// Load the stored config. Missing or malformed is [`Error::ConfigLoad`].
    fn load(&self) -> Result<Config>;

    /// Persist `config`, replacing any stored one.
    fn store(&self, config: &Config) -> Result<()>;

    /// Whether a config has been stored.
    fn exists(&self) -> Result<bool>;

    /// Remove everything stored for `config`'s project.
    fn delete_all(&self, config: &Config) -> Result<()>;

    /// Write `bytes` under `key`, replacing any previous value.
    fn store_asset(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Remove the asset under `key`. Removing a missing asset is not an error.
    fn delete_asset(&self, key: &str) -> Result<()>;

    /// Read the asset under `key`, `None` if it was never stored.
    fn load_asset(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// [`ConfigStore`] backed by a directory per project.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    project: String,
}

impl FileStore {
    /// Store for `project` under `root`.
    pub fn new(root: impl Into<PathBuf>, project: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            project: project.into(),
        }
    }

    /// Directory holding everything for this project.
    pub fn project_dir(&self) -> PathBuf {
        self.root.join(&self.project)
    }

    /// Where terraform keeps its state for this project.
    pub fn terraform_state_path(&self) -> PathBuf {
        self.project_dir().join(TERRAFORM_STATE_FILENAME)
    }

    fn config_path(&self) -> PathBuf {
        self.project_dir().join(CONFIG_FILENAME)
    }

    fn asset_path(&self, key: &str) -> Result<PathBuf> {
        let plain = !key.is_empty()
            && key != "."
            && !key.contains("..")
            && !key.contains('/')
            && !key.contains('\\');
        if !plain {
            return Err(Error::persistence(
                format!("invalid asset key '{key}'"),
                io::Error::new(io::ErrorKind::InvalidInput, "asset keys are plain file names"),
            ));
        }
        Ok(self.project_dir().join(ASSETS_DIR).join(key))
    }
}

impl ConfigStore for FileStore {
    fn load(&self) -> Result<Config> {
        let path = self.config_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ConfigLoad(format!(
                    "no config stored for project '{}'",
                    self.project
                )));
            }
            Err(e) => {
                return Err(Error::ConfigLoad(format!(
                    "could not read {}: {e}",
                    path.display()
                )));
            }
        };
        Config::from_stored(&content)
    }

    fn store(&self, config: &Config) -> Result<()> {
        let content = config.to_toml()?;
        let path = self.config_path();
        log::debug!("Storing config at {}", path.display());
        write_private(&path, content.as_bytes())
    }

    fn exists(&self) -> Result<bool> {
        let path = self.config_path();
        path.try_exists()
            .map_err(|e| Error::persistence(format!("checking {}", path.display()), e))
    }

    fn delete_all(&self, config: &Config) -> Result<()> {
        let dir = self.root.join(&config.project);
        log::debug!("Removing {}", dir.display());
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(format!("removing {}", dir.display()), e)),
        }
    }

    fn store_asset(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.asset_path(key)?;
        log::debug!("Storing asset {key} ({} bytes)", bytes.len());
        write_private(&path, bytes)
    }

    fn delete_asset(&self, key: &str) -> Result<()> {
        let path = self.asset_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(format!("removing asset {key}"), e)),
        }
    }

    fn load_asset(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.asset_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::persistence(format!("reading asset {key}"), e)),
        }
    }
}

/// Write through a sibling temp file so a crash never leaves a torn file.
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    let context = || format!("writing {}", path.display());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::persistence(context(), e))?;
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| Error::persistence(context(), e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::persistence(context(), e))?;
    }
    fs::rename(&tmp, path).map_err(|e| Error::persistence(context(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path(), "happymeal");
        (dir, store)
    }

    #[test]
    fn test_store_and_load_config() {
        let (_dir, store) = store();
        assert!(!store.exists().unwrap());

        let config = sample();
        store.store(&config).unwrap();
        assert!(store.exists().unwrap());
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_load_missing_config() {
        let (_dir, store) = store();
        let err = store.load().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigLoad);
    }

    #[test]
    fn test_load_corrupt_config() {
        let (_dir, store) = store();
        fs::create_dir_all(store.project_dir()).unwrap();
        fs::write(store.project_dir().join(CONFIG_FILENAME), "not = [toml").unwrap();
        let err = store.load().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigLoad);
    }

    #[test]
    fn test_assets() {
        let (_dir, store) = store();
        assert_eq!(store.load_asset("director-state.json").unwrap(), None);

        store.store_asset("director-state.json", b"{ state }").unwrap();
        assert_eq!(
            store.load_asset("director-state.json").unwrap(),
            Some(b"{ state }".to_vec())
        );

        store.store_asset("director-state.json", b"B").unwrap();
        assert_eq!(store.load_asset("director-state.json").unwrap(), Some(b"B".to_vec()));

        store.delete_asset("director-state.json").unwrap();
        assert_eq!(store.load_asset("director-state.json").unwrap(), None);
        store.delete_asset("director-state.json").unwrap();
    }

    #[test]
    fn test_asset_key_with_separator_rejected() {
        let (_dir, store) = store();
        for key in ["../config.toml", "a/b", "..", ""] {
            let err = store.store_asset(key, b"x").unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Persistence, "key {key:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_assets_are_private() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, store) = store();
        store.store_asset("director-state.json", b"{}").unwrap();
        let path = store.project_dir().join(ASSETS_DIR).join("director-state.json");
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_delete_all_removes_project_dir() {
        let (dir, store) = store();
        let config = sample();
        store.store(&config).unwrap();
        store.store_asset("director-state.json", b"{}").unwrap();
        fs::write(store.terraform_state_path(), "{}").unwrap();

        store.delete_all(&config).unwrap();
        assert!(!store.project_dir().exists());
        assert!(dir.path().exists());
        store.delete_all(&config).unwrap();
    }
}
