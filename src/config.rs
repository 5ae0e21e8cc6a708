use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::media::CompressionBudget;

pub const DEFAULT_AI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse";

/// Optional overrides read from `~/.config/agricraft/config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dimension: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub ai_endpoint: String,
    /// Sent as `X-App-Id` to identify the application to the backend.
    pub app_id: Option<String>,
    pub max_upload_bytes: u64,
    pub max_dimension: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai_endpoint: DEFAULT_AI_ENDPOINT.to_string(),
            app_id: None,
            max_upload_bytes: CompressionBudget::DEFAULT_MAX_BYTES,
            max_dimension: CompressionBudget::DEFAULT_MAX_DIMENSION,
        }
    }
}

impl AppConfig {
    /// Resolve configuration with priority: ENV > global config file > default
    pub fn load() -> Result<Self> {
        let file = match global_config_path() {
            Ok(path) if path.exists() => load_config_file(&path)?,
            _ => ConfigFile::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a config file with environment lookups over the defaults.
    pub fn resolve(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let ai_endpoint = env("AGRICRAFT_AI_ENDPOINT")
            .or(file.ai_endpoint)
            .unwrap_or(defaults.ai_endpoint);
        let app_id = env("AGRICRAFT_APP_ID")
            .or(file.app_id)
            .filter(|id| !id.is_empty());
        let max_upload_bytes = match env("AGRICRAFT_MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid AGRICRAFT_MAX_UPLOAD_BYTES: {raw}"))?,
            None => file.max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
        };
        let max_dimension = match env("AGRICRAFT_MAX_DIMENSION") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid AGRICRAFT_MAX_DIMENSION: {raw}"))?,
            None => file.max_dimension.unwrap_or(defaults.max_dimension),
        };

        let config = Self {
            ai_endpoint,
            app_id,
            max_upload_bytes,
            max_dimension,
        };
        debug!(?config, "Configuration resolved");
        Ok(config)
    }

    pub fn budget(&self) -> CompressionBudget {
        CompressionBudget {
            max_bytes: self.max_upload_bytes,
            max_dimension: self.max_dimension,
        }
    }
}

/// ~/.config/agricraft/config.json
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Failed to get config directory")?
        .join("agricraft");
    Ok(config_dir.join("config.json"))
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: ConfigFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}
