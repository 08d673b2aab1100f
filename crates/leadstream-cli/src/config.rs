//! CLI configuration file.

use anyhow::Context;
use leadstream_client::{ApiConfig, DEFAULT_POLL_INTERVAL, StoreConfig};
use leadstream_core::{CurrentUser, Role};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub redirect_delay_ms: u64,
    pub redirect_path: String,
    /// WebSocket endpoint for queue counters; `watch` skips them if unset.
    pub socket_url: Option<String>,
    pub viewer: Option<Viewer>,
}

/// Identity used to evaluate edit/delete/pin permissions locally.
#[derive(Debug, Clone, Deserialize)]
pub struct Viewer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub role: Role,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: ApiConfig::default().base_url,
            token: None,
            timeout_secs: 30,
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            redirect_delay_ms: 2000,
            redirect_path: "/leads".to_string(),
            socket_url: None,
            viewer: None,
        }
    }
}

impl Config {
    /// Read `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn api(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    pub fn store(&self) -> StoreConfig {
        StoreConfig {
            redirect_delay: Duration::from_millis(self.redirect_delay_ms),
            redirect_path: self.redirect_path.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.viewer
            .as_ref()
            .map(|v| CurrentUser::new(v.id.clone(), v.name.clone(), v.role))
    }
}
