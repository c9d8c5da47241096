// Configuration loader
// Loads ZooConfig from ~/.ssl-backbones/config.toml or an explicit path

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::ZooConfig;

/// Default location of the config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssl-backbones/config.toml"))
}

/// Load configuration from the default location, falling back to defaults
pub fn load_config() -> Result<ZooConfig> {
    match default_config_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => {
            tracing::debug!("No config file found, using defaults");
            Ok(ZooConfig::default())
        }
    }
}

/// Load configuration from an explicit file (must exist)
pub fn load_config_from(path: &Path) -> Result<ZooConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: ZooConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    // Default paths are joined with '/', keep a single separator
    let config = ZooConfig {
        storage_root: config.storage_root.trim_end_matches('/').to_string(),
        ..config
    };

    tracing::info!(
        "Loaded config from {} (root: {}, device: {})",
        path.display(),
        config.storage_root,
        config.device.name()
    );

    Ok(config)
}
