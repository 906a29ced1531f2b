//! rumqttc-backed [`CommandTransport`] and the inbound event loop.

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use camlink_app::ports::{CommandTransport, InboundMessage};
use camlink_app::router::SUBSCRIPTIONS;
use camlink_domain::error::CamlinkError;

use crate::config::MqttConfig;
use crate::error::MqttError;

/// Publishing half of the broker connection.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
}

/// Receiving half: drives the connection and forwards device messages.
pub struct MqttEventLoop {
    client: AsyncClient,
    eventloop: EventLoop,
    sink: mpsc::Sender<InboundMessage>,
    reconnect_delay: std::time::Duration,
}

impl MqttTransport {
    /// Build the client. Nothing touches the network until
    /// [`MqttEventLoop::run`] is polled.
    #[must_use]
    pub fn new(config: &MqttConfig, sink: mpsc::Sender<InboundMessage>) -> (Self, MqttEventLoop) {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(config.keep_alive());
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }
        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity.max(1));
        let transport = Self {
            client: client.clone(),
        };
        let events = MqttEventLoop {
            client,
            eventloop,
            sink,
            reconnect_delay: config.reconnect_delay(),
        };
        (transport, events)
    }

    /// Ask the broker to close the session.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] when the event loop is already gone.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        self.client.disconnect().await.map_err(MqttError::Client)
    }
}

impl CommandTransport for MqttTransport {
    /// Enqueue without waiting: a full request queue is reported as a
    /// transport failure instead of parking the caller.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), CamlinkError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(MqttError::Client)?;
        Ok(())
    }
}

impl MqttEventLoop {
    /// Poll the connection until the inbound queue closes or the client
    /// disconnects. Subscriptions are renewed on every connection.
    pub async fn run(mut self) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    tracing::info!("connected to broker");
                    self.subscribe();
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    let message = InboundMessage::new(publish.topic, publish.payload.to_vec());
                    if !self.forward(message) {
                        tracing::info!("inbound queue closed, stopping event loop");
                        break;
                    }
                }
                Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => {
                    tracing::info!("disconnected from broker");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = ?err, delay = ?self.reconnect_delay, "broker connection lost, retrying");
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    /// Hand a message to the ingest queue without blocking the poll loop.
    /// Returns `false` once the queue is closed.
    fn forward(&self, message: InboundMessage) -> bool {
        match self.sink.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                tracing::warn!(topic = %message.topic, "inbound queue full, dropping message");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    fn subscribe(&self) {
        for filter in SUBSCRIPTIONS {
            if let Err(err) = self.client.try_subscribe(filter, QoS::AtLeastOnce) {
                tracing::warn!(filter, error = %MqttError::Client(err), "subscribe failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_report_transport_error_when_event_loop_is_gone() {
        let (sink, _inbound) = mpsc::channel(1);
        let (transport, events) = MqttTransport::new(&MqttConfig::default(), sink);
        drop(events);

        let result = transport.publish("cam/D1/cmd", b"{}".to_vec()).await;
        assert!(matches!(result, Err(CamlinkError::Transport(_))));
    }

    #[tokio::test]
    async fn should_fail_fast_when_request_queue_is_full() {
        let config = MqttConfig {
            channel_capacity: 2,
            ..MqttConfig::default()
        };
        let (sink, _inbound) = mpsc::channel(1);
        let (transport, _events) = MqttTransport::new(&config, sink);

        for _ in 0..2 {
            let result = transport.publish("cam/D1/cmd", b"{}".to_vec()).await;
            assert!(result.is_ok());
        }
        let third = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            transport.publish("cam/D1/cmd", b"{}".to_vec()),
        )
        .await
        .expect("publish must not wait for the event loop");
        assert!(matches!(third, Err(CamlinkError::Transport(_))));
    }

    #[tokio::test]
    async fn should_drop_inbound_message_when_queue_is_full() {
        let (sink, mut inbound) = mpsc::channel(1);
        let (_transport, events) = MqttTransport::new(&MqttConfig::default(), sink);

        assert!(events.forward(InboundMessage::new("cam/D1/status", b"1".to_vec())));
        assert!(events.forward(InboundMessage::new("cam/D1/status", b"2".to_vec())));

        let first = inbound.recv().await.unwrap();
        assert_eq!(first.payload, b"1".to_vec());
        assert!(inbound.try_recv().is_err());

        drop(inbound);
        assert!(!events.forward(InboundMessage::new("cam/D1/status", b"3".to_vec())));
    }

    #[tokio::test]
    async fn should_queue_publish_while_event_loop_is_alive() {
        let (sink, _inbound) = mpsc::channel(1);
        let (transport, _events) = MqttTransport::new(&MqttConfig::default(), sink);

        let result = transport.publish("cam/D1/cmd", b"{}".to_vec()).await;
        assert!(result.is_ok());
    }
}
