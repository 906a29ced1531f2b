//! # camlink-adapter-mqtt
//!
//! MQTT adapter — the gateway's link to the camera nodes.
//!
//! ## Responsibilities
//! - Connect to the broker with rumqttc and keep the session alive
//! - Subscribe to `cam/+/{result,status,dht,config,upload}`
//! - Forward inbound publishes to the ingest queue as [`InboundMessage`]s
//! - Implement [`CommandTransport`] for outbound `cam/{id}/cmd` messages
//!
//! ## Dependency rule
//! Same as other adapters: depends on `camlink-app` and `camlink-domain`.
//!
//! [`InboundMessage`]: camlink_app::ports::InboundMessage
//! [`CommandTransport`]: camlink_app::ports::CommandTransport

pub mod config;
pub mod error;
pub mod transport;

pub use config::MqttConfig;
pub use error::MqttError;
pub use transport::{MqttEventLoop, MqttTransport};
