//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `camlink.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use camlink_adapter_mqtt::MqttConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Broker connection.
    pub mqtt: MqttConfig,
    /// Message processing and live event tuning.
    pub gateway: GatewayConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
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

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inbound messages processed concurrently.
    pub ingest_workers: usize,
    /// Inbound messages buffered between the broker and the workers.
    pub inbound_queue: usize,
    /// Live events buffered per subscriber before new ones are dropped.
    pub subscriber_queue: usize,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `camlink.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("camlink.toml")?;
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
        if let Ok(val) = std::env::var("CAMLINK_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("CAMLINK_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("CAMLINK_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("CAMLINK_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("CAMLINK_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("CAMLINK_MQTT_PORT")
            && let Ok(port) = val.parse()
        {
            self.mqtt.broker_port = port;
        }
        if let Ok(val) = std::env::var("CAMLINK_LOG") {
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
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt broker port must be non-zero".to_string(),
            ));
        }
        if self.gateway.ingest_workers == 0 {
            return Err(ConfigError::Validation(
                "ingest_workers must be non-zero".to_string(),
            ));
        }
        if self.gateway.inbound_queue == 0 || self.gateway.subscriber_queue == 0 {
            return Err(ConfigError::Validation(
                "queue capacities must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
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

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:camlink.db?mode=rwc".to_string(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ingest_workers: 8,
            inbound_queue: 256,
            subscriber_queue: 64,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "camlinkd=info,camlink=info,tower_http=debug".to_string(),
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
