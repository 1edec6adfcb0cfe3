//! Client configuration file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use mailsync_core::SyncSettings;
use mailsync_remote::RemoteConfig;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "MAILSYNC_CONFIG";

/// Contents of `settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server connection.
    pub remote: RemoteConfig,
    /// Engine settings.
    pub sync: SyncSettings,
}

/// Default settings file location.
pub fn settings_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV).map_or_else(
        || {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mailsync")
                .join("settings.json")
        },
        PathBuf::from,
    )
}

/// Location of the client-side store (expanded folders and the like).
pub fn local_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsync")
        .join("local.json")
}

/// Loads the configuration; a missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load(path: &Path) -> anyhow::Result<AppConfig> {
    if !path.exists() {
        tracing::info!("No settings at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }

    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Writes the configuration, creating the parent directory.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub async fn save(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let contents = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path, contents).await?;
    tracing::info!("Settings saved to {:?}", path);
    Ok(())
}
