//! # infrakit
//!
//! Provision and tear down the infrastructure a director runs on.
//!
//! [`Provisioner`] is the seam orchestration code depends on;
//! [`terraform::TerraformClient`] implements it by driving the terraform CLI
//! in a scratch workspace, and [`Metadata`] is what comes back from
//! `terraform output`.

#![warn(clippy::all)]

pub mod error;
pub mod metadata;
pub mod terraform;

pub use error::{Error, ErrorKind, Result};
pub use metadata::Metadata;
pub use terraform::{TerraformClient, TerraformConfig};

/// Infrastructure provisioner for one deployment.
pub trait Provisioner {
    /// Create or converge the infrastructure.
    fn apply(&self) -> Result<()>;

    /// Read the current infrastructure outputs.
    fn output(&self) -> Result<Metadata>;

    /// Tear the infrastructure down.
    fn destroy(&self) -> Result<()>;

    /// Release the provisioner's own workspace. Safe to call more than once.
    fn cleanup(&mut self) -> Result<()>;
}
