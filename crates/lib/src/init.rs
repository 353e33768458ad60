//! Write a starter config file the user fills in with their bot credentials.

use anyhow::{Context, Result};
use std::path::Path;

static DEFAULT_CONFIG: &str = include_str!("../config/config.yaml");

/// Create the parent directory and write the template config if no file exists yet.
/// Returns true when a file was written.
pub fn init_config(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        log::debug!("config already exists at {}, skipping", config_path.display());
        return Ok(false);
    }
    let dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating config directory {}", dir.display()))?;
    std::fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("writing default config to {}", config_path.display()))?;
    log::info!("created default config at {}", config_path.display());
    Ok(true)
}
