use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::DEFAULT_QUOTA_BYTES;

pub const DEFAULT_LATENCY_MS: u64 = 500;

#[derive(Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub app_name: String,
    /// Simulated network delay applied to login, signup and account
    /// recovery.
    pub latency: Duration,
    pub storage_quota_bytes: u64,
    pub assistant_url: Option<String>,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::temp_dir(),
            app_name: "MVPS Portal".to_string(),
            latency: Duration::ZERO,
            storage_quota_bytes: DEFAULT_QUOTA_BYTES,
            assistant_url: None,
        }
    }
}

/// Optional on-disk configuration. Every field can also be set on the
/// command line, which wins over the file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub app_name: Option<String>,
    pub latency_ms: Option<u64>,
    pub storage_quota_bytes: Option<u64>,
    pub assistant: Option<AssistantSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantSection {
    pub url: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read config file: {err}"),
            ConfigError::Parse(err) => write!(f, "failed to parse config file: {err}"),
        }
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&raw).map_err(ConfigError::Parse)
    }
}
