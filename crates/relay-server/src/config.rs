//! Server configuration.
//!
//! A `relay.toml` file (see `relay.toml.example`) supplies the settings.
//! Missing keys take their defaults, and `RELAY_HOST` / `RELAY_PORT` override
//! the bind address wherever the rest came from. `RELAY_CONFIG` names an
//! explicit file and skips the search path.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_ENV: &str = "RELAY_CONFIG";
const HOST_ENV: &str = "RELAY_HOST";
const PORT_ENV: &str = "RELAY_PORT";

const SEARCH_PATH: [&str; 3] = [
    "relay.toml",
    "/etc/relay/relay.toml",
    "~/.config/relay/relay.toml",
];

/// Relay server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interface to bind.
    pub host: String,
    /// TCP port for the WebSocket endpoint.
    pub port: u16,
    pub transport: TransportConfig,
    pub limits: LimitsConfig,
    pub metrics: MetricsConfig,
}

/// Where clients reach the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Route that upgrades to a STOMP WebSocket.
    pub websocket_path: String,
}

/// Bounds on what one client or the whole relay may hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted WebSocket message, in bytes.
    pub max_message_size: usize,
    /// Destinations that may have subscribers at once.
    pub max_destinations: usize,
    pub max_subscriptions_per_session: usize,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            transport: TransportConfig::default(),
            limits: LimitsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            websocket_path: "/stomp".to_string(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024,
            max_destinations: 10_000,
            max_subscriptions_per_session: 100,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
        }
    }
}

impl Config {
    /// Load the configuration the binary runs with.
    ///
    /// Uses `RELAY_CONFIG` when set, otherwise the first existing file on the
    /// search path, otherwise defaults. Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if a chosen file cannot be read or parsed, or if the
    /// result fails [`Config::validate`].
    pub fn load() -> Result<Self> {
        let mut config = match locate()? {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this structure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(std::env::var(HOST_ENV).ok(), std::env::var(PORT_ENV).ok())
    }

    fn apply_overrides(&mut self, host: Option<String>, port: Option<String>) -> Result<()> {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port
                .parse()
                .with_context(|| format!("{PORT_ENV} is not a port number: {port}"))?;
        }
        Ok(())
    }

    /// Reject settings the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if !self.transport.websocket_path.starts_with('/') {
            bail!(
                "transport.websocket_path must start with '/': {}",
                self.transport.websocket_path
            );
        }
        if self.transport.websocket_path == "/health" {
            bail!("transport.websocket_path collides with the health endpoint");
        }
        if self.limits.max_message_size == 0
            || self.limits.max_destinations == 0
            || self.limits.max_subscriptions_per_session == 0
        {
            bail!("limits must be greater than zero");
        }
        Ok(())
    }

    /// Socket address of the WebSocket listener.
    ///
    /// # Errors
    ///
    /// Returns an error if `host:port` is not a valid socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address: {}:{}", self.host, self.port))
    }
}

fn locate() -> Result<Option<PathBuf>> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(shellexpand::tilde(&explicit).as_ref());
        if !path.exists() {
            bail!("{CONFIG_ENV} points to a missing file: {}", path.display());
        }
        return Ok(Some(path));
    }

    Ok(SEARCH_PATH
        .iter()
        .map(|candidate| PathBuf::from(shellexpand::tilde(candidate).as_ref()))
        .find(|path| path.exists()))
}
