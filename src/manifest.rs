//! Director manifest, cloud config and application manifest generation.
//!
//! Documents are typed structs serialized to YAML. Provider-specific property
//! bags stay as JSON values since the director passes them through untouched.

use crate::config::Config;
use crate::error::{Error, Result};
use directorkit::Artifacts;
use infrakit::Metadata;
use serde::Serialize;
use serde_json::{Value, json};

const DIRECTOR_RELEASE_URL: &str =
    "https://bosh.io/d/github.com/cloudfoundry/bosh?v=262.3";
const CPI_RELEASE_URL: &str =
    "https://bosh.io/d/github.com/cloudfoundry-incubator/bosh-aws-cpi-release?v=65";
const DIRECTOR_STEMCELL_URL: &str =
    "https://bosh.io/d/stemcells/bosh-aws-xen-hvm-ubuntu-trusty-go_agent?v=3421.11";

/// Director's address on the private network.
pub const DIRECTOR_INTERNAL_IP: &str = "10.0.0.6";
const PRIVATE_RANGE: &str = "10.0.0.0/24";
const PRIVATE_GATEWAY: &str = "10.0.0.1";
const PRIVATE_DNS: &str = "10.0.0.2";
const RESERVED_RANGE: &str = "10.0.0.1-10.0.0.10";

#[derive(Debug, Serialize)]
struct Release {
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct Network {
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    subnets: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct DirectorManifest {
    name: &'static str,
    releases: Vec<Release>,
    resource_pools: Vec<Value>,
    disk_pools: Vec<Value>,
    networks: Vec<Network>,
    jobs: Vec<Value>,
    cloud_provider: Value,
}

#[derive(Debug, Serialize)]
struct CloudConfig {
    azs: Vec<Value>,
    vm_types: Vec<Value>,
    disk_types: Vec<Value>,
    vm_extensions: Vec<Value>,
    networks: Vec<Network>,
    compilation: Value,
}

#[derive(Debug, Serialize)]
struct AppManifest {
    name: String,
    releases: Vec<Release>,
    stemcells: Vec<Value>,
    instance_groups: Vec<Value>,
    update: Value,
}

fn availability_zone(config: &Config) -> String {
    format!("{}a", config.region)
}

fn to_yaml(name: &'static str, document: &impl Serialize) -> Result<Vec<u8>> {
    serde_yaml::to_string(document)
        .map(String::into_bytes)
        .map_err(|source| Error::Manifest { name, source })
}

/// Manifest `create-env` and `delete-env` run against.
pub fn director_manifest(config: &Config, metadata: &Metadata) -> Result<Vec<u8>> {
    let az = availability_zone(config);
    let ip = &metadata.director_public_ip;
    let db = json!({
        "adapter": "postgres",
        "host": metadata.bosh_db_address,
        "port": metadata.bosh_db_port,
        "user": config.db_username,
        "password": config.db_password,
        "database": "bosh",
    });
    let aws = json!({
        "access_key_id": metadata.bosh_user_access_key_id,
        "secret_access_key": metadata.bosh_secret_access_key,
        "default_key_name": metadata.director_key_pair,
        "default_security_groups": [metadata.director_security_group_id],
        "region": config.region,
    });

    let manifest = DirectorManifest {
        name: "bosh",
        releases: vec![
            Release {
                name: "bosh",
                url: Some(DIRECTOR_RELEASE_URL),
                version: None,
            },
            Release {
                name: "bosh-aws-cpi",
                url: Some(CPI_RELEASE_URL),
                version: None,
            },
        ],
        resource_pools: vec![json!({
            "name": "vms",
            "network": "private",
            "stemcell": { "url": DIRECTOR_STEMCELL_URL },
            "cloud_properties": {
                "instance_type": "t2.small",
                "ephemeral_disk": { "size": 25_000, "type": "gp2" },
                "availability_zone": az,
            },
        })],
        disk_pools: vec![json!({
            "name": "disks",
            "disk_size": 20_000,
            "cloud_properties": { "type": "gp2" },
        })],
        networks: vec![
            Network {
                name: "private",
                kind: "manual",
                subnets: vec![json!({
                    "range": PRIVATE_RANGE,
                    "gateway": PRIVATE_GATEWAY,
                    "dns": [PRIVATE_DNS],
                    "cloud_properties": { "subnet": metadata.default_subnet_id },
                })],
            },
            Network {
                name: "public",
                kind: "vip",
                subnets: Vec::new(),
            },
        ],
        jobs: vec![json!({
            "name": "bosh",
            "instances": 1,
            "templates": [
                { "name": "nats", "release": "bosh" },
                { "name": "director", "release": "bosh" },
                { "name": "health_monitor", "release": "bosh" },
                { "name": "registry", "release": "bosh" },
                { "name": "aws_cpi", "release": "bosh-aws-cpi" },
            ],
            "resource_pool": "vms",
            "persistent_disk_pool": "disks",
            "networks": [
                { "name": "private", "static_ips": [DIRECTOR_INTERNAL_IP], "default": ["dns", "gateway"] },
                { "name": "public", "static_ips": [ip] },
            ],
            "properties": {
                "nats": { "address": "127.0.0.1", "user": "nats", "password": config.director_password },
                "postgres": db,
                "registry": {
                    "address": DIRECTOR_INTERNAL_IP,
                    "host": DIRECTOR_INTERNAL_IP,
                    "db": db,
                    "username": config.director_username,
                    "password": config.director_password,
                    "port": 25_777,
                },
                "blobstore": {
                    "provider": "s3",
                    "bucket_name": metadata.blobstore_bucket,
                    "access_key_id": metadata.blobstore_user_access_key_id,
                    "secret_access_key": metadata.blobstore_secret_access_key,
                    "s3_region": config.region,
                },
                "director": {
                    "address": "127.0.0.1",
                    "name": config.deployment,
                    "db": db,
                    "cpi_job": "aws_cpi",
                    "user_management": {
                        "provider": "local",
                        "local": { "users": [
                            { "name": config.director_username, "password": config.director_password },
                        ] },
                    },
                },
                "hm": {
                    "director_account": {
                        "user": config.director_username,
                        "password": config.director_password,
                    },
                    "resurrector_enabled": true,
                },
                "aws": aws,
                "agent": { "mbus": format!("nats://nats:{}@{}:4222", config.director_password, DIRECTOR_INTERNAL_IP) },
                "ntp": ["0.pool.ntp.org", "1.pool.ntp.org"],
            },
        })],
        cloud_provider: json!({
            "template": { "name": "aws_cpi", "release": "bosh-aws-cpi" },
            "ssh_tunnel": {
                "host": ip,
                "port": 22,
                "user": "vcap",
                "private_key": format!("./{}", directorkit::PEM_FILENAME),
            },
            "mbus": format!("https://mbus:{}@{ip}:6868", config.director_password),
            "properties": {
                "aws": aws,
                "agent": { "mbus": format!("https://mbus:{}@0.0.0.0:6868", config.director_password) },
                "blobstore": { "provider": "local", "path": "/var/vcap/micro_bosh/data/cache" },
                "ntp": ["0.pool.ntp.org", "1.pool.ntp.org"],
            },
        }),
    };

    to_yaml("director manifest", &manifest)
}

/// Cloud config applied once the director is up.
pub fn cloud_config(config: &Config, metadata: &Metadata) -> Result<Vec<u8>> {
    let az = availability_zone(config);
    let document = CloudConfig {
        azs: vec![json!({ "name": "z1", "cloud_properties": { "availability_zone": az } })],
        vm_types: vec![
            json!({ "name": "concourse-web", "cloud_properties": { "instance_type": "t2.small" } }),
            json!({ "name": "concourse-worker", "cloud_properties": {
                "instance_type": "m4.xlarge",
                "ephemeral_disk": { "size": 200_000, "type": "gp2" },
            } }),
            json!({ "name": "compilation", "cloud_properties": { "instance_type": "c4.large" } }),
        ],
        disk_types: vec![json!({ "name": "default", "disk_size": 50_000, "cloud_properties": { "type": "gp2" } })],
        vm_extensions: vec![json!({
            "name": "elb",
            "cloud_properties": {
                "elbs": [metadata.elb_name],
                "security_groups": [metadata.elb_security_group_id, metadata.vms_security_group_id],
            },
        })],
        networks: vec![Network {
            name: "default",
            kind: "manual",
            subnets: vec![json!({
                "range": PRIVATE_RANGE,
                "gateway": PRIVATE_GATEWAY,
                "az": "z1",
                "dns": [PRIVATE_DNS],
                "reserved": [RESERVED_RANGE],
                "cloud_properties": {
                    "subnet": metadata.default_subnet_id,
                    "security_groups": [metadata.vms_security_group_id],
                },
            })],
        }],
        compilation: json!({
            "workers": 5,
            "reuse_compilation_vms": true,
            "az": "z1",
            "vm_type": "compilation",
            "network": "default",
        }),
    };
    to_yaml("cloud config", &document)
}

/// Application manifest deployed onto the director.
pub fn app_manifest(config: &Config, metadata: &Metadata) -> Result<Vec<u8>> {
    let external_url = format!("http://{}", metadata.elb_name);
    let document = AppManifest {
        name: config.app_deployment.clone(),
        releases: vec![
            Release {
                name: "concourse",
                url: None,
                version: Some("latest"),
            },
            Release {
                name: "garden-runc",
                url: None,
                version: Some("latest"),
            },
        ],
        stemcells: vec![json!({ "alias": "trusty", "os": "ubuntu-trusty", "version": "latest" })],
        instance_groups: vec![
            json!({
                "name": "web",
                "instances": 1,
                "azs": ["z1"],
                "vm_type": "concourse-web",
                "vm_extensions": ["elb"],
                "stemcell": "trusty",
                "networks": [{ "name": "default" }],
                "jobs": [{
                    "name": "atc",
                    "release": "concourse",
                    "properties": {
                        "external_url": external_url,
                        "basic_auth_username": config.director_username,
                        "basic_auth_password": config.director_password,
                        "postgresql": {
                            "host": metadata.bosh_db_address,
                            "port": metadata.bosh_db_port,
                            "database": config.db_name,
                            "role": { "name": config.db_username, "password": config.db_password },
                        },
                    },
                }, {
                    "name": "tsa",
                    "release": "concourse",
                    "properties": {},
                }],
            }),
            json!({
                "name": "worker",
                "instances": 1,
                "azs": ["z1"],
                "vm_type": "concourse-worker",
                "stemcell": "trusty",
                "networks": [{ "name": "default" }],
                "jobs": [
                    { "name": "groundcrew", "release": "concourse", "properties": {} },
                    { "name": "baggageclaim", "release": "concourse", "properties": {} },
                    { "name": "garden", "release": "garden-runc", "properties": {
                        "garden": { "listen_network": "tcp", "listen_address": "0.0.0.0:7777" },
                    } },
                ],
            }),
        ],
        update: json!({
            "canaries": 1,
            "max_in_flight": 1,
            "serial": false,
            "canary_watch_time": "1000-60000",
            "update_watch_time": "1000-60000",
        }),
    };
    to_yaml("application manifest", &document)
}

/// Everything a director session needs written before it converges or deletes.
pub fn artifacts(config: &Config, metadata: &Metadata) -> Result<Artifacts> {
    Ok(Artifacts {
        private_key: config.private_key.clone().into_bytes(),
        manifest: director_manifest(config, metadata)?,
        cloud_config: cloud_config(config, metadata)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::tests::sample;

    pub(crate) fn metadata() -> Metadata {
        Metadata {
            director_public_ip: "99.99.99.99".into(),
            director_key_pair: "-- KEY --".into(),
            director_security_group_id: "sg-123".into(),
            vms_security_group_id: "sg-456".into(),
            default_subnet_id: "sn-123".into(),
            bosh_db_address: "rds.aws.com".into(),
            bosh_db_port: "5432".into(),
            bosh_user_access_key_id: "abc123".into(),
            bosh_secret_access_key: "abc123".into(),
            blobstore_bucket: "blobs.aws.com".into(),
            blobstore_user_access_key_id: "abc123".into(),
            blobstore_secret_access_key: "abc123".into(),
            elb_security_group_id: "sg-789".into(),
            elb_name: "elb-123".into(),
        }
    }

    fn parse(bytes: &[u8]) -> serde_yaml::Value {
        serde_yaml::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_director_manifest_uses_metadata() {
        let doc = parse(&director_manifest(&sample(), &metadata()).unwrap());
        assert_eq!(doc["name"], "bosh");
        assert_eq!(doc["cloud_provider"]["ssh_tunnel"]["host"], "99.99.99.99");
        assert_eq!(doc["cloud_provider"]["ssh_tunnel"]["private_key"], "./director.pem");
        assert_eq!(doc["networks"][0]["subnets"][0]["cloud_properties"]["subnet"], "sn-123");
        assert_eq!(doc["jobs"][0]["properties"]["postgres"]["host"], "rds.aws.com");
        assert_eq!(
            doc["resource_pools"][0]["cloud_properties"]["availability_zone"],
            "eu-west-1a"
        );
    }

    #[test]
    fn test_cloud_config_wires_load_balancer() {
        let doc = parse(&cloud_config(&sample(), &metadata()).unwrap());
        assert_eq!(doc["vm_extensions"][0]["cloud_properties"]["elbs"][0], "elb-123");
        assert_eq!(
            doc["networks"][0]["subnets"][0]["cloud_properties"]["security_groups"][0],
            "sg-456"
        );
    }

    #[test]
    fn test_app_manifest_uses_configured_database() {
        let doc = parse(&app_manifest(&sample(), &metadata()).unwrap());
        assert_eq!(doc["name"], "concourse");
        let atc = &doc["instance_groups"][0]["jobs"][0]["properties"];
        assert_eq!(atc["postgresql"]["database"], "concourse_atc");
        assert_eq!(atc["postgresql"]["port"], "5432");
    }

    #[test]
    fn test_artifacts_carry_private_key() {
        let artifacts = artifacts(&sample(), &metadata()).unwrap();
        assert_eq!(artifacts.private_key, b"example-private-key");
        assert!(!artifacts.manifest.is_empty());
        assert!(!artifacts.cloud_config.is_empty());
    }
}
