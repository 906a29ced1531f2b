//! MQTT connection configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier of the gateway.
    pub client_id: String,
    /// Optional broker credentials.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Pause between reconnection attempts, in seconds.
    pub reconnect_delay_secs: u16,
    /// Capacity of the request channel between client and event loop.
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "camlink-gateway".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            reconnect_delay_secs: 2,
            channel_capacity: 64,
        }
    }
}

impl MqttConfig {
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.into())
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs.into())
    }
}
