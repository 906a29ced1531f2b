//! MQTT adapter error types.

use camlink_domain::error::CamlinkError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client refused the request (event loop gone or queue full).
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl From<MqttError> for CamlinkError {
    fn from(err: MqttError) -> Self {
        CamlinkError::Transport(Box::new(err))
    }
}
