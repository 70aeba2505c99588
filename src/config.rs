//! Client configuration.
//!
//! Settings are read from `smartfarm.toml` (by default
//! `<config dir>/smartfarm/smartfarm.toml`) and layered file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! base_url = "http://localhost:8080"
//! timeout_secs = 15
//!
//! [session]
//! path = "/home/me/.local/share/smartfarm/session.json"
//! ```
//!
//! Environment overrides: `SMARTFARM_BASE_URL`, `SMARTFARM_TIMEOUT_SECS`,
//! `SMARTFARM_SESSION_PATH`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_BASE_URL: &str = "SMARTFARM_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "SMARTFARM_TIMEOUT_SECS";
pub const ENV_SESSION_PATH: &str = "SMARTFARM_SESSION_PATH";

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Base URL the `/api/...` paths are appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where the session is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Parsed `smartfarm.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartfarmToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub session: SessionSection,
}

impl SmartfarmToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse smartfarm.toml")
    }

    /// Load from `path`, or defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content =
            toml::to_string_pretty(self).context("Failed to serialize smartfarm.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !is_http_url(&self.server.base_url) {
            warnings.push(format!(
                "Invalid base_url '{}': should start with http:// or https://",
                self.server.base_url
            ));
        }
        if self.server.timeout_secs == 0 {
            warnings.push("timeout_secs is 0: every request would time out".to_string());
        }

        warnings
    }
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty())
}

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("smartfarm").join("smartfarm.toml"))
}

/// Fully resolved client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// File the settings were read from (may not exist)
    pub config_path: Option<PathBuf>,
    /// Parsed file contents
    pub toml: SmartfarmToml,
    /// CLI override for the base URL
    pub cli_base_url: Option<String>,
}

impl ClientConfig {
    /// Load the config file (explicit path or default location) and apply a
    /// CLI base URL override.
    pub fn load(config_path: Option<PathBuf>, cli_base_url: Option<String>) -> Result<Self> {
        let config_path = config_path.or_else(default_config_path);
        let toml = match &config_path {
            Some(path) => SmartfarmToml::load_or_default(path)?,
            None => SmartfarmToml::default(),
        };
        Ok(Self {
            config_path,
            toml,
            cli_base_url,
        })
    }

    /// Base URL (CLI → env → file), without a trailing slash.
    pub fn base_url(&self) -> String {
        let url = self
            .cli_base_url
            .clone()
            .or_else(|| std::env::var(ENV_BASE_URL).ok())
            .unwrap_or_else(|| self.toml.server.base_url.clone());
        url.trim_end_matches('/').to_string()
    }

    /// Request timeout (env → file).
    pub fn timeout(&self) -> Duration {
        let secs = std::env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(self.toml.server.timeout_secs);
        Duration::from_secs(secs)
    }

    /// Session file (env → file → data dir).
    pub fn session_path(&self) -> Option<PathBuf> {
        std::env::var(ENV_SESSION_PATH)
            .ok()
            .map(PathBuf::from)
            .or_else(|| self.toml.session.path.clone())
            .or_else(crate::session::FileStore::default_path)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        if let Some(url) = &self.cli_base_url
            && !is_http_url(url)
        {
            warnings.push(format!("Invalid --base-url '{}'", url));
        }
        warnings
    }
}
