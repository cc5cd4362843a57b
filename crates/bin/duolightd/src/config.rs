//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `duolight.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use duolight_adapter_ble::BleConfig;
use duolight_app::services::accessory::AccessorySettings;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Accessory tuning and naming.
    pub bridge: BridgeConfig,
    /// BLE scanner settings.
    pub ble: BleConfig,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Settings shared by every bridged accessory.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Idle period after which a lamp link is closed, in milliseconds.
    pub idle_timeout_ms: u64,
    /// Capacity of each accessory's request queue.
    pub queue_capacity: usize,
    /// Known fixtures, named by address.
    pub accessories: Vec<AccessoryConfig>,
}

/// A named fixture.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessoryConfig {
    pub name: String,
    pub address: String,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Scan for fixtures over Bluetooth.
    pub ble_enabled: bool,
    /// Bridge simulated fixtures.
    pub virtual_enabled: bool,
}

impl Config {
    /// Load configuration from `duolight.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("duolight.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DUOLIGHT_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("DUOLIGHT_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("DUOLIGHT_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("DUOLIGHT_IDLE_TIMEOUT_MS")
            && let Ok(ms) = val.parse()
        {
            self.bridge.idle_timeout_ms = ms;
        }
        if let Ok(val) = std::env::var("DUOLIGHT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.bridge.idle_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "idle_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.bridge.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "queue_capacity must be non-zero".to_string(),
            ));
        }
        if let Some(accessory) = self
            .bridge
            .accessories
            .iter()
            .find(|a| a.address.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "accessory {:?} has an empty address",
                accessory.name
            )));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Tuning handed to every accessory.
    #[must_use]
    pub fn accessory_settings(&self) -> AccessorySettings {
        AccessorySettings {
            idle_timeout: Duration::from_millis(self.bridge.idle_timeout_ms),
            queue_capacity: self.bridge.queue_capacity,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "duolightd=info,duolight=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 5000,
            queue_capacity: 32,
            accessories: Vec::new(),
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            ble_enabled: true,
            virtual_enabled: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
