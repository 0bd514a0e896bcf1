//! Client configuration: API base URL, request timeout, state directory.
//!
//! Loaded from `makerlink.toml` when present, with serde defaults otherwise,
//! then overridden by environment variables so deployments can repoint the
//! backend without editing files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

pub const ENV_API_URL: &str = "MAKERLINK_API_URL";
pub const ENV_STATE_DIR: &str = "MAKERLINK_STATE_DIR";

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where persisted client state lives. `None` means the platform default.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:4000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout_secs(),
            state_dir: None,
        }
    }
}

impl ClientConfig {
    pub async fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let config_path = dir.as_ref().join("makerlink.toml");
        let mut config = if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path)
                .await
                .with_context(|| format!("reading {}", config_path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?
        } else {
            info!("No makerlink.toml found, using defaults.");
            Self::default()
        };

        if let Ok(url) = std::env::var(ENV_API_URL) {
            config.base_url = url;
        }
        if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
            config.state_dir = Some(PathBuf::from(dir));
        }

        info!(
            "Client config: base_url={}, timeout={}s",
            config.base_url, config.request_timeout_secs
        );
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.base_url, default_base_url());
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.state_dir.is_none());
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("makerlink.toml"),
            "base_url = \"https://api.makerlink.example/v1\"\n",
        )
        .await
        .unwrap();
        let config = ClientConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.base_url, "https://api.makerlink.example/v1");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("makerlink.toml"), "base_url = [42]")
            .await
            .unwrap();
        assert!(ClientConfig::load(dir.path()).await.is_err());
    }
}
