//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `commander.toml` in the working directory, or for the file named
//! by `COMMANDER_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::path::PathBuf;
use std::time::Duration;

use commander_adapter_http::HttpConfig;
use commander_adapter_mqtt::MqttConfig;
use serde::Deserialize;

const DEFAULT_PATH: &str = "commander.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Instance name, reported by the status API.
    pub name: String,
    /// IANA timezone schedules are evaluated in.
    pub timezone: String,
    /// Evaluate automations without running any action.
    pub muted: bool,
    /// Message bus connection.
    pub mqtt: MqttConfig,
    /// HTTP action client.
    pub http: HttpConfig,
    /// Automation files.
    pub automations: AutomationsConfig,
    /// Status API listener.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Where automation files live and how often they are checked for changes.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AutomationsConfig {
    pub path: PathBuf,
    pub poll_interval_secs: u64,
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

impl Config {
    /// Load configuration from `COMMANDER_CONFIG` or `commander.toml` (if
    /// present) then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("COMMANDER_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
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

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("COMMANDER_NAME") {
            self.name = val;
        }
        if let Some(val) = var("COMMANDER_TIMEZONE") {
            self.timezone = val;
        }
        if let Some(muted) = var("COMMANDER_MUTED").and_then(|val| val.parse().ok()) {
            self.muted = muted;
        }
        if let Some(val) = var("COMMANDER_MQTT_URI") {
            self.mqtt.uri = Some(val);
        }
        if let Some(val) = var("COMMANDER_AUTOMATIONS_PATH") {
            self.automations.path = PathBuf::from(val);
        }
        if let Some(val) = var("COMMANDER_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("COMMANDER_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("COMMANDER_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("COMMANDER_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.automations.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "automations poll interval must be non-zero".to_string(),
            ));
        }
        if self.automations.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "automations path must not be empty".to_string(),
            ));
        }
        commander_adapter_cron::timezone(&self.timezone)
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.automations.poll_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "commander".to_string(),
            timezone: "UTC".to_string(),
            muted: false,
            mqtt: MqttConfig::default(),
            http: HttpConfig::default(),
            automations: AutomationsConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AutomationsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("automations"),
            poll_interval_secs: 5,
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
            filter: "commanderd=info,commander=info".to_string(),
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
