//! Topic router — classifies inbound messages and hands them to the right
//! service.

use std::future::Future;
use std::sync::Arc;

use camlink_domain::device::DeviceStatus;
use camlink_domain::telemetry::{ClimateReading, CommandReply, ConfigReport, UploadNotice};

use crate::automation_engine::AutomationEngine;
use crate::ports::{
    AutomationConfigRepository, Clock, CommandTransport, EventPublisher, HistoryStore,
    InboundMessage, OperationLogRepository,
};
use crate::services::command_dispatcher::CommandDispatcher;
use crate::services::device_state_cache::DeviceStateCache;

/// Topic filters the gateway subscribes to.
pub const SUBSCRIPTIONS: [&str; 5] = [
    "cam/+/result",
    "cam/+/status",
    "cam/+/dht",
    "cam/+/config",
    "cam/+/upload",
];

/// Category of an inbound topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Result,
    Status,
    Telemetry,
    ConfigReport,
    Upload,
}

/// A recognised topic and the device it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified<'a> {
    pub client_id: &'a str,
    pub kind: TopicKind,
}

/// Classify `cam/{id}/{suffix}`. Anything else, including our own `cmd`
/// topic, yields `None`.
#[must_use]
pub fn classify(topic: &str) -> Option<Classified<'_>> {
    let mut segments = topic.split('/');
    let (Some("cam"), Some(client_id), Some(suffix), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };
    if client_id.is_empty() {
        return None;
    }
    let kind = match suffix {
        "result" => TopicKind::Result,
        "status" => TopicKind::Status,
        "dht" => TopicKind::Telemetry,
        "config" => TopicKind::ConfigReport,
        "upload" => TopicKind::Upload,
        _ => return None,
    };
    Some(Classified { client_id, kind })
}

/// Consumer of inbound messages.
pub trait MessageHandler {
    /// Process one message. Never fails: problems are logged and the message
    /// is dropped.
    fn handle(&self, message: InboundMessage) -> impl Future<Output = ()> + Send;
}

/// Routes classified messages to the cache, the correlator and the
/// automation engine.
pub struct MessageRouter<H, R, T, L, P, C> {
    cache: Arc<DeviceStateCache<H, P, C>>,
    dispatcher: Arc<CommandDispatcher<T, L, P, C>>,
    automation: Arc<AutomationEngine<R, T, L, P, C>>,
}

impl<H, R, T, L, P, C> MessageRouter<H, R, T, L, P, C>
where
    H: HistoryStore + Send + Sync,
    R: AutomationConfigRepository + Send + Sync,
    T: CommandTransport + Send + Sync,
    L: OperationLogRepository + Send + Sync,
    P: EventPublisher + Send + Sync,
    C: Clock + Send + Sync,
{
    pub fn new(
        cache: Arc<DeviceStateCache<H, P, C>>,
        dispatcher: Arc<CommandDispatcher<T, L, P, C>>,
        automation: Arc<AutomationEngine<R, T, L, P, C>>,
    ) -> Self {
        Self {
            cache,
            dispatcher,
            automation,
        }
    }

    async fn on_status(&self, client_id: &str, status: DeviceStatus) {
        let health = status.free_heap.zip(status.rssi);
        if let Err(err) = self.cache.upsert(client_id, status).await {
            tracing::warn!(client_id, error = %err, "unable to record status history");
        }
        if let Some((free_heap, rssi)) = health
            && let Err(err) = self.automation.on_health(client_id, free_heap, rssi).await
        {
            tracing::warn!(client_id, error = %err, "health automation failed");
        }
    }

    async fn on_climate(&self, client_id: &str, reading: ClimateReading) {
        if let Err(err) = self.cache.record_climate(client_id, &reading).await {
            tracing::warn!(client_id, error = %err, "unable to record climate history");
        }
        if let Err(err) = self.automation.on_climate(client_id, &reading).await {
            tracing::warn!(client_id, error = %err, "climate automation failed");
        }
    }
}

impl<H, R, T, L, P, C> MessageHandler for MessageRouter<H, R, T, L, P, C>
where
    H: HistoryStore + Send + Sync,
    R: AutomationConfigRepository + Send + Sync,
    T: CommandTransport + Send + Sync,
    L: OperationLogRepository + Send + Sync,
    P: EventPublisher + Send + Sync,
    C: Clock + Send + Sync,
{
    async fn handle(&self, message: InboundMessage) {
        let Some(Classified { client_id, kind }) = classify(&message.topic) else {
            tracing::trace!(topic = %message.topic, "ignoring topic");
            return;
        };
        let payload = message.payload.as_slice();
        match kind {
            TopicKind::Result => {
                if let Some(reply) = parse::<CommandReply>(&message.topic, payload) {
                    self.dispatcher.handle_result(client_id, reply).await;
                }
            }
            TopicKind::Status => {
                if let Some(status) = parse::<DeviceStatus>(&message.topic, payload) {
                    self.on_status(client_id, status).await;
                }
            }
            TopicKind::Telemetry => {
                if let Some(reading) = parse::<ClimateReading>(&message.topic, payload) {
                    self.on_climate(client_id, reading).await;
                }
            }
            TopicKind::ConfigReport => {
                if let Some(report) = parse::<ConfigReport>(&message.topic, payload) {
                    self.cache.report_config(client_id, &report);
                }
            }
            TopicKind::Upload => {
                if let Some(notice) = parse::<UploadNotice>(&message.topic, payload) {
                    self.dispatcher.handle_upload(client_id, notice).await;
                }
            }
        }
    }
}

fn parse<V: serde::de::DeserializeOwned>(topic: &str, payload: &[u8]) -> Option<V> {
    serde_json::from_slice(payload)
        .inspect_err(|err| tracing::warn!(topic, error = %err, "malformed payload dropped"))
        .ok()
}
