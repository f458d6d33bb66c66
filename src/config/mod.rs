//! Configuration module for ShopAlly-RS
//!
//! Handles loading and validating settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

/// Locations searched for settings.yml, in order
pub fn settings_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
        PathBuf::from("/etc/shopally/settings.yml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("shopally-rs/settings.yml"));
    }
    paths
}

/// Load settings from `SHOPALLY_SETTINGS_PATH`, the default locations or
/// built-in defaults, then apply environment overrides
pub fn load() -> Result<Settings> {
    let explicit = std::env::var("SHOPALLY_SETTINGS_PATH")
        .ok()
        .map(PathBuf::from)
        .filter(|p| p.exists());

    let found = explicit.or_else(|| settings_paths().into_iter().find(|p| p.exists()));

    let mut settings = match found {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(&path)?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };

    settings.merge_env();
    settings.validate()?;
    Ok(settings)
}
