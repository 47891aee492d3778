//! Centralized path resolution for stackup
//!
//! # Environment Variables
//!
//! - `STACKUP_CONFIG_DIR` - Override config directory (terraform modules live here)
//! - `STACKUP_STATE_DIR` - Override state directory (stored configs and assets)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `STACKUP_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/stackup` (if set)
//! 3. `~/.config/stackup`
//!
//! For state_dir():
//! 1. `STACKUP_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/stackup` (if set)
//! 3. `~/.local/state/stackup`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "STACKUP_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "STACKUP_STATE_DIR";

/// Get the stackup config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("stackup");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("stackup");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the stackup state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("stackup");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join("stackup");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Terraform module used when a config does not name one.
pub fn default_module_source() -> Result<PathBuf> {
    Ok(config_dir()?.join("modules").join("aws"))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
