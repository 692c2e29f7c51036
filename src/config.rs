//! Runtime configuration for the relay and the detection client.
//!
//! Resolution order: built-in defaults, then a TOML file, then environment
//! variables. The inference token additionally falls back to the OS keychain.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::capture::MAX_IMAGE_BYTES;
use crate::error::ScreeningError;

pub const DEFAULT_SPACE_URL: &str = "https://nawaf707-teledentai.hf.space";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000/api";

/// Keychain service holding the inference token.
pub const TOKEN_KEYCHAIN_SERVICE: &str = "teledent-hf-token";
const KEYCHAIN_USER: &str = "teledent";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub relay: RelayConfig,
    pub client: ClientConfig,
}

/// Settings for the proxy relay in front of the inference service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind_addr: String,
    /// Base URL of the hosted inference service.
    pub space_url: String,
    /// Bearer token for private inference spaces. Never serialized back out.
    #[serde(skip_serializing)]
    pub hf_token: Option<String>,
    pub upstream_timeout_secs: u64,
    pub max_image_bytes: usize,
    pub environment: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            space_url: DEFAULT_SPACE_URL.to_string(),
            hf_token: None,
            upstream_timeout_secs: 30,
            max_image_bytes: MAX_IMAGE_BYTES,
            environment: "development".to_string(),
        }
    }
}

impl RelayConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// Settings for the client that talks to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
            health_timeout_secs: 5,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from `path` (or the default location if it exists),
    /// apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok());

        if config.relay.hf_token.is_none() {
            config.relay.hf_token = token_from_keychain();
        }

        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/teledent/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("teledent").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("HF_SPACE_URL") {
            self.relay.space_url = v;
        }
        if let Some(v) = non_empty("HF_TOKEN") {
            self.relay.hf_token = Some(v);
        }
        if let Some(v) = non_empty("TELEDENT_BIND") {
            self.relay.bind_addr = v;
        }
        if let Some(v) = non_empty("TELEDENT_ENV") {
            self.relay.environment = v;
        }
        if let Some(v) = non_empty("TELEDENT_API_URL") {
            self.client.api_base_url = v;
        }
    }

    pub fn validate(&self) -> Result<(), ScreeningError> {
        parse_http_url("relay.space_url", &self.relay.space_url)?;
        parse_http_url("client.api_base_url", &self.client.api_base_url)?;

        self.relay.bind_addr.parse::<SocketAddr>().map_err(|e| {
            ScreeningError::Config(format!(
                "relay.bind_addr '{}' is not a socket address: {}",
                self.relay.bind_addr, e
            ))
        })?;

        if self.relay.upstream_timeout_secs == 0
            || self.client.request_timeout_secs == 0
            || self.client.health_timeout_secs == 0
        {
            return Err(ScreeningError::Config("Timeouts must be at least 1 second".to_string()));
        }
        if self.relay.max_image_bytes == 0 {
            return Err(ScreeningError::Config("relay.max_image_bytes must be positive".to_string()));
        }
        Ok(())
    }
}

/// Parse an http(s) URL, naming the offending setting on failure.
pub fn parse_http_url(field: &str, value: &str) -> Result<Url, ScreeningError> {
    let url = Url::parse(value)
        .map_err(|e| ScreeningError::Config(format!("{} '{}' is not a valid URL: {}", field, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ScreeningError::Config(format!(
            "{} must use http or https, got '{}'",
            field, other
        ))),
    }
}

/// Look up the inference token in the OS keychain.
pub fn token_from_keychain() -> Option<String> {
    let entry = match Entry::new(TOKEN_KEYCHAIN_SERVICE, KEYCHAIN_USER) {
        Ok(entry) => entry,
        Err(e) => {
            warn!("Failed to create keyring entry for {}: {}", TOKEN_KEYCHAIN_SERVICE, e);
            return None;
        }
    };
    match entry.get_password() {
        Ok(token) => {
            info!("Using inference token from keychain");
            Some(token)
        }
        Err(keyring::Error::NoEntry) => {
            debug!("No inference token in keychain");
            None
        }
        Err(e) => {
            warn!("Failed to read inference token from keychain: {}", e);
            None
        }
    }
}
