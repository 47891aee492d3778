//! Deployment configuration.
//!
//! Operators author a TOML file; key material may be given inline or as a
//! path (`private_key_file = "~/.ssh/director.pem"`). Once loaded, a
//! [`Config`] carries resolved values only and is what the store persists.

use crate::error::{Error, Result};
use crate::paths;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Application deployment name when the config does not set one.
pub const DEFAULT_APP_DEPLOYMENT: &str = "concourse";

static NAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").ok());

// Interpolated into CREATE DATABASE, so identifiers only
static DB_NAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Everything needed to provision, converge and deploy one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Project name; also the directory the store keeps state under
    pub project: String,
    /// Deployment identity used to name infrastructure
    pub deployment: String,
    /// Cloud region
    pub region: String,

    /// Public half of the director key pair
    pub public_key: String,
    /// Private key the director VM is reachable with
    pub private_key: String,

    pub director_username: String,
    pub director_password: String,
    /// PEM CA certificate the director presents
    pub director_ca_cert: String,

    pub db_username: String,
    pub db_password: String,
    /// Database created for the application
    pub db_name: String,

    /// Name of the application deployment on the director
    #[serde(default = "default_app_deployment")]
    pub app_deployment: String,

    /// Stemcell uploaded after the cloud config, if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stemcell_url: Option<String>,

    /// Terraform module source; defaults to the bundled AWS module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terraform_source: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_app_deployment() -> String {
    DEFAULT_APP_DEPLOYMENT.to_string()
}

/// On-disk shape of an operator-authored config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    project: String,
    deployment: String,
    region: String,

    public_key: Option<String>,
    public_key_file: Option<String>,
    private_key: Option<String>,
    private_key_file: Option<String>,

    director_username: String,
    director_password: String,
    director_ca_cert: Option<String>,
    director_ca_cert_file: Option<String>,

    db_username: String,
    db_password: String,
    db_name: String,

    app_deployment: Option<String>,
    stemcell_url: Option<String>,
    terraform_source: Option<String>,
}

impl Config {
    /// Load and validate an operator config file.
    ///
    /// Relative `*_file` paths resolve against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(format!("could not read {}: {e}", path.display())))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base)
    }

    /// Parse an operator config from TOML text.
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| Error::ConfigLoad(format!("invalid config: {e}")))?;

        let config = Self {
            public_key: resolve("public_key", file.public_key, file.public_key_file, base_dir)?,
            private_key: resolve("private_key", file.private_key, file.private_key_file, base_dir)?,
            director_ca_cert: resolve(
                "director_ca_cert",
                file.director_ca_cert,
                file.director_ca_cert_file,
                base_dir,
            )?,
            project: file.project,
            deployment: file.deployment,
            region: file.region,
            director_username: file.director_username,
            director_password: file.director_password,
            db_username: file.db_username,
            db_password: file.db_password,
            db_name: file.db_name,
            app_deployment: file.app_deployment.unwrap_or_else(default_app_deployment),
            stemcell_url: file.stemcell_url,
            terraform_source: file.terraform_source,
            created_at: Utc::now(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a config previously written by [`to_toml`](Self::to_toml).
    pub fn from_stored(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("stored config is corrupt: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize for storage.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigLoad(format!("could not serialize config: {e}")))
    }

    /// Check names that end up in paths, resource names and SQL.
    pub fn validate(&self) -> Result<()> {
        check("project", &self.project, &NAME_PATTERN)?;
        check("deployment", &self.deployment, &NAME_PATTERN)?;
        check("app_deployment", &self.app_deployment, &NAME_PATTERN)?;
        check("db_name", &self.db_name, &DB_NAME_PATTERN)?;

        for (field, value) in [
            ("region", &self.region),
            ("private_key", &self.private_key),
            ("director_username", &self.director_username),
            ("director_password", &self.director_password),
            ("db_username", &self.db_username),
            ("db_password", &self.db_password),
        ] {
            if value.trim().is_empty() {
                return Err(Error::ConfigLoad(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

fn check(field: &str, value: &str, pattern: &LazyLock<Option<Regex>>) -> Result<()> {
    let valid = pattern.as_ref().is_some_and(|re| re.is_match(value));
    if valid {
        Ok(())
    } else {
        Err(Error::ConfigLoad(format!("invalid {field} '{value}'")))
    }
}

fn resolve(
    field: &str,
    inline: Option<String>,
    file: Option<String>,
    base_dir: &Path,
) -> Result<String> {
    match (inline, file) {
        (Some(_), Some(_)) => Err(Error::ConfigLoad(format!(
            "set either {field} or {field}_file, not both"
        ))),
        (Some(value), None) => Ok(value),
        (None, Some(path)) => {
            let path = base_dir.join(paths::expand(&path));
            fs::read_to_string(&path).map_err(|e| {
                Error::ConfigLoad(format!(
                    "could not read {field}_file {}: {e}",
                    path.display()
                ))
            })
        }
        (None, None) => Err(Error::ConfigLoad(format!(
            "missing {field} (or {field}_file)"
        ))),
    }
}
