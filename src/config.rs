use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::render::RenderOptions;

pub const DEFAULT_SERVER_URL: &str = "https://hatbot-flask-backend.onrender.com";
pub const WEBSOCKET_TRANSPORT: &str = "websocket";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat service connection
    pub server: ServerConfig,

    /// Conversation view behaviour
    pub ui: UiConfig,

    /// Markdown renderer switches
    pub render: RenderOptions,
}

/// Where and how to reach the chat service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub transport: String,
    pub namespace: String,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub indicator_period_ms: u64,
    /// 0 waits forever
    pub reply_timeout_secs: u64,
    pub max_messages: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            transport: WEBSOCKET_TRANSPORT.to_string(),
            namespace: "/".to_string(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            indicator_period_ms: 500,
            reply_timeout_secs: 120,
            max_messages: 500,
        }
    }
}

impl Config {
    /// `~/.astrolino`
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".astrolino"))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load configuration from `path`, falling back to defaults when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = self.to_toml()?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.transport != WEBSOCKET_TRANSPORT {
            bail!(
                "Unsupported transport '{}': only '{}' is available",
                self.server.transport,
                WEBSOCKET_TRANSPORT
            );
        }
        if !self.server.namespace.starts_with('/') {
            bail!("Namespace must start with '/': '{}'", self.server.namespace);
        }
        if self.ui.indicator_period_ms == 0 {
            bail!("ui.indicator_period_ms must be greater than zero");
        }
        if self.ui.max_messages == 0 {
            bail!("ui.max_messages must be greater than zero");
        }
        Ok(())
    }

    pub fn indicator_period(&self) -> Duration {
        Duration::from_millis(self.ui.indicator_period_ms)
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        match self.ui.reply_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.url, DEFAULT_SERVER_URL);
        assert_eq!(config.indicator_period(), Duration::from_millis(500));
        assert!(!config.render.mangle);
        assert!(!config.render.header_ids);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[server]\nurl = \"http://localhost:5000\"\n\n[ui]\nreply_timeout_secs = 0\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.url, "http://localhost:5000");
        assert_eq!(config.server.transport, WEBSOCKET_TRANSPORT);
        assert_eq!(config.reply_timeout(), None);
        assert_eq!(config.ui.max_messages, 500);
    }

    #[test]
    fn polling_transport_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\ntransport = \"polling\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("polling"));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.ui.reply_timeout_secs = 30;
        config.render.header_ids = true;

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
