//! Recording test doubles shared by the engine tests.
//!
//! Every fake appends to one [`ActionLog`] so tests can assert on the exact
//! interleaving of director, database, provisioner and store calls.

use crate::config::Config;
use crate::db::DbRunner;
use crate::error::{Error, Result};
use crate::store::ConfigStore;
use directorkit::{Director, DirectorClient};
use infrakit::{Metadata, Provisioner};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Shared, ordered record of calls.
#[derive(Debug, Clone, Default)]
pub struct ActionLog(Rc<RefCell<Vec<String>>>);

impl ActionLog {
    pub fn push(&self, action: impl Into<String>) {
        self.0.borrow_mut().push(action.into());
    }

    pub fn actions(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn contains(&self, action: &str) -> bool {
        self.0.borrow().iter().any(|a| a == action)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0.borrow().iter().filter(|a| a.starts_with(prefix)).count()
    }
}

fn exit_error(command: &str) -> execkit::Error {
    execkit::Error::Exit {
        command: command.to_string(),
        code: Some(1),
        output: "boom".to_string(),
    }
}

/// Director whose workspace is a temp dir and whose commands are scripted.
pub struct FakeDirector {
    log: ActionLog,
    dir: Option<TempDir>,
    root: PathBuf,
    pub converge_output: String,
    /// Commands (first argument) that fail
    pub failing: Vec<&'static str>,
    /// Written to the state file whenever a command runs
    pub state_after_run: Option<Vec<u8>>,
}

impl FakeDirector {
    pub fn new(log: &ActionLog) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        Self {
            log: log.clone(),
            dir: Some(dir),
            root,
            converge_output: "Finished deploying".to_string(),
            failing: Vec::new(),
            state_after_run: Some(b"{ some state }".to_vec()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn script(&self, args: &[String]) -> directorkit::Result<String> {
        if let Some(state) = &self.state_after_run {
            std::fs::write(self.root.join(directorkit::STATE_FILENAME), state).unwrap();
        }
        let command = match args.first().map(String::as_str) {
            Some("--deployment") => args.get(2),
            _ => args.first(),
        }
        .map_or("", String::as_str);
        if self.failing.contains(&command) {
            return Err(exit_error(command).into());
        }
        if command == "create-env" {
            return Ok(self.converge_output.clone());
        }
        Ok(String::new())
    }
}

impl Director for FakeDirector {
    fn save_file(&self, name: &str, contents: &[u8]) -> directorkit::Result<PathBuf> {
        self.log.push(format!("save {name}"));
        let path = self.root.join(name);
        std::fs::write(&path, contents).unwrap();
        Ok(path)
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read_file(&self, name: &str) -> directorkit::Result<Option<Vec<u8>>> {
        Ok(std::fs::read(self.root.join(name)).ok())
    }

    fn run_command(&self, args: &[String]) -> directorkit::Result<String> {
        self.log.push(format!("run {}", args.join(" ")));
        self.script(args)
    }

    fn run_authenticated_command(&self, args: &[String]) -> directorkit::Result<String> {
        self.log.push(format!("auth {}", args.join(" ")));
        self.script(args)
    }

    fn cleanup(&mut self) -> directorkit::Result<()> {
        self.log.push("director cleanup");
        self.dir.take();
        Ok(())
    }
}

/// Database runner that records statements.
pub struct FakeDb {
    log: ActionLog,
    /// Error output returned instead of success
    pub failure: Option<&'static str>,
}

impl FakeDb {
    pub fn new(log: &ActionLog) -> Self {
        Self {
            log: log.clone(),
            failure: None,
        }
    }
}

impl DbRunner for FakeDb {
    fn run(&self, sql: &str) -> Result<()> {
        self.log.push(format!("sql {sql}"));
        match self.failure {
            None => Ok(()),
            Some(output) => Err(Error::Database(execkit::Error::Exit {
                command: "psql".into(),
                code: Some(1),
                output: output.into(),
            })),
        }
    }
}

/// Provisioner returning fixed metadata.
pub struct FakeProvisioner {
    log: ActionLog,
    metadata: Metadata,
    pub fail_output: bool,
    pub fail_destroy: bool,
    pub fail_apply: bool,
}

impl FakeProvisioner {
    pub fn new(log: &ActionLog, metadata: Metadata) -> Self {
        Self {
            log: log.clone(),
            metadata,
            fail_output: false,
            fail_destroy: false,
            fail_apply: false,
        }
    }
}

fn provisioner_result(fail: bool, command: &str) -> infrakit::Result<()> {
    if fail {
        Err(exit_error(command).into())
    } else {
        Ok(())
    }
}

impl Provisioner for FakeProvisioner {
    fn apply(&self) -> infrakit::Result<()> {
        self.log.push("apply");
        provisioner_result(self.fail_apply, "terraform apply")
    }

    fn output(&self) -> infrakit::Result<Metadata> {
        self.log.push("output");
        provisioner_result(self.fail_output, "terraform output")?;
        Ok(self.metadata.clone())
    }

    fn destroy(&self) -> infrakit::Result<()> {
        self.log.push("destroy");
        provisioner_result(self.fail_destroy, "terraform destroy")
    }

    fn cleanup(&mut self) -> infrakit::Result<()> {
        self.log.push("provisioner cleanup");
        Ok(())
    }
}

/// Director client whose delete outcome is scripted.
pub struct FakeDirectorClient {
    log: ActionLog,
    pub delete_error: Option<Option<Vec<u8>>>,
}

impl FakeDirectorClient {
    pub fn new(log: &ActionLog) -> Self {
        Self {
            log: log.clone(),
            delete_error: None,
        }
    }
}

impl DirectorClient for FakeDirectorClient {
    fn deploy_director(&mut self) -> directorkit::Result<Vec<u8>> {
        self.log.push("deploy_director");
        Ok(Vec::new())
    }

    fn delete_director(&mut self) -> directorkit::Result<()> {
        self.log.push("delete_director");
        match self.delete_error.take() {
            None => Ok(()),
            Some(partial_state) => Err(directorkit::Error::DeleteFailed {
                source: Box::new(exit_error("delete-env").into()),
                partial_state,
            }),
        }
    }

    fn cleanup(&mut self) -> directorkit::Result<()> {
        self.log.push("director cleanup");
        Ok(())
    }
}

/// In-memory store.
pub struct FakeStore {
    log: ActionLog,
    pub config: RefCell<Option<Config>>,
    pub assets: RefCell<BTreeMap<String, Vec<u8>>>,
    pub fail_store_asset: Cell<bool>,
}

impl FakeStore {
    pub fn new(log: &ActionLog, config: Option<Config>) -> Self {
        Self {
            log: log.clone(),
            config: RefCell::new(config),
            assets: RefCell::new(BTreeMap::new()),
            fail_store_asset: Cell::new(false),
        }
    }

    pub fn asset(&self, key: &str) -> Option<Vec<u8>> {
        self.assets.borrow().get(key).cloned()
    }
}

impl ConfigStore for FakeStore {
    fn load(&self) -> Result<Config> {
        self.log.push("load");
        self.config
            .borrow()
            .clone()
            .ok_or_else(|| Error::ConfigLoad("no config stored".into()))
    }

    fn store(&self, config: &Config) -> Result<()> {
        self.log.push("store");
        *self.config.borrow_mut() = Some(config.clone());
        Ok(())
    }

    fn exists(&self) -> Result<bool> {
        Ok(self.config.borrow().is_some())
    }

    fn delete_all(&self, _config: &Config) -> Result<()> {
        self.log.push("delete_all");
        self.config.borrow_mut().take();
        self.assets.borrow_mut().clear();
        Ok(())
    }

    fn store_asset(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.log.push(format!(
            "store_asset {key} {}",
            String::from_utf8_lossy(bytes)
        ));
        if self.fail_store_asset.get() {
            return Err(Error::persistence(
                "storing asset",
                std::io::Error::other("disk full"),
            ));
        }
        self.assets.borrow_mut().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete_asset(&self, key: &str) -> Result<()> {
        self.log.push(format!("delete_asset {key}"));
        self.assets.borrow_mut().remove(key);
        Ok(())
    }

    fn load_asset(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.log.push(format!("load_asset {key}"));
        Ok(self.asset(key))
    }
}
