//! Transport port — the publish/subscribe link to the devices.

use std::future::Future;

use camlink_domain::error::CamlinkError;

/// Publishes raw payloads on a topic.
pub trait CommandTransport {
    /// Hand a payload to the broker. Resolves once the client accepted it,
    /// not when the device received it.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), CamlinkError>> + Send;
}

impl<T: CommandTransport + Send + Sync> CommandTransport for std::sync::Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), CamlinkError>> + Send {
        (**self).publish(topic, payload)
    }
}

/// A message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}
