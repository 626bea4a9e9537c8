use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::DepcacheConfig;

/// Project config file name
pub const CONFIG_FILE: &str = "depcache.toml";

/// Discovers depcache configuration by traversing up the directory tree
pub fn discover_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok(Some(config_path));
        }

        // Try to go up one level
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    // Fallback to global config
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("depcache").join("config.toml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// Loads configuration with auto-discovery support
///
/// If `explicit_path` is provided, loads config from that path.
/// Otherwise, auto-discovers config by traversing up directory tree from cwd.
/// Falls back to defaults when nothing is found. The result is validated.
pub fn load_config_with_discovery(explicit_path: Option<&Path>) -> Result<DepcacheConfig> {
    let config = if let Some(config_path) = explicit_path {
        DepcacheConfig::from_file(config_path)?
    } else {
        let current_dir = std::env::current_dir()
            .context("Failed to get current directory for config discovery")?;

        match discover_config(&current_dir)? {
            Some(discovered_path) => {
                tracing::debug!(path = %discovered_path.display(), "using discovered config");
                DepcacheConfig::from_file(&discovered_path)?
            }
            None => DepcacheConfig::default(),
        }
    };

    config.validate()?;
    Ok(config)
}
