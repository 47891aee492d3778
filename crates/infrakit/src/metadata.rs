//! Infrastructure metadata read back from terraform outputs.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Names of every output the infrastructure module must expose.
pub const OUTPUT_NAMES: &[&str] = &[
    "director_public_ip",
    "director_key_pair",
    "director_security_group_id",
    "vms_security_group_id",
    "default_subnet_id",
    "bosh_db_address",
    "bosh_db_port",
    "bosh_user_access_key_id",
    "bosh_secret_access_key",
    "blobstore_bucket",
    "blobstore_user_access_key_id",
    "blobstore_secret_access_key",
    "elb_security_group_id",
    "elb_name",
];

#[derive(Debug, Deserialize)]
struct OutputValue {
    value: serde_json::Value,
}

/// Outputs of the provisioned infrastructure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub director_public_ip: String,
    pub director_key_pair: String,
    pub director_security_group_id: String,
    pub vms_security_group_id: String,
    pub default_subnet_id: String,
    pub bosh_db_address: String,
    pub bosh_db_port: String,
    pub bosh_user_access_key_id: String,
    pub bosh_secret_access_key: String,
    pub blobstore_bucket: String,
    pub blobstore_user_access_key_id: String,
    pub blobstore_secret_access_key: String,
    pub elb_security_group_id: String,
    pub elb_name: String,
}

impl Metadata {
    /// Parse the JSON printed by `terraform output -json`.
    ///
    /// Every name in [`OUTPUT_NAMES`] must be present. Numeric outputs (the
    /// database port) are accepted and rendered as strings.
    pub fn from_output_json(json: &str) -> Result<Self> {
        let outputs: BTreeMap<String, OutputValue> = serde_json::from_str(json)?;
        let get = |name: &str| -> Result<String> {
            let value = &outputs
                .get(name)
                .ok_or_else(|| Error::MissingOutput(name.to_string()))?
                .value;
            Ok(match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => return Err(Error::MissingOutput(name.to_string())),
                other => other.to_string(),
            })
        };

        Ok(Self {
            director_public_ip: get("director_public_ip")?,
            director_key_pair: get("director_key_pair")?,
            director_security_group_id: get("director_security_group_id")?,
            vms_security_group_id: get("vms_security_group_id")?,
            default_subnet_id: get("default_subnet_id")?,
            bosh_db_address: get("bosh_db_address")?,
            bosh_db_port: get("bosh_db_port")?,
            bosh_user_access_key_id: get("bosh_user_access_key_id")?,
            bosh_secret_access_key: get("bosh_secret_access_key")?,
            blobstore_bucket: get("blobstore_bucket")?,
            blobstore_user_access_key_id: get("blobstore_user_access_key_id")?,
            blobstore_secret_access_key: get("blobstore_secret_access_key")?,
            elb_security_group_id: get("elb_security_group_id")?,
            elb_name: get("elb_name")?,
        })
    }

    /// Director API URL.
    pub fn director_url(&self) -> String {
        format!("https://{}:25555", self.director_public_ip)
    }
}
