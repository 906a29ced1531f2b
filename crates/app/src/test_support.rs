//! In-memory port implementations shared by the service tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{TimeDelta, TimeZone, Utc};

use camlink_domain::automation::AutomationConfig;
use camlink_domain::command::CommandId;
use camlink_domain::error::CamlinkError;
use camlink_domain::event::LiveEvent;
use camlink_domain::history::{ClimateSample, StatusSample};
use camlink_domain::operation_log::{OperationLog, OperationOutcome};
use camlink_domain::time::Timestamp;

use crate::ports::{
    AutomationConfigRepository, Clock, CommandTransport, EventPublisher, HistoryStore,
    OperationLogRepository,
};

#[derive(Debug)]
pub struct BrokenPipe;

impl std::fmt::Display for BrokenPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("broken pipe")
    }
}

impl std::error::Error for BrokenPipe {}

// ── Transport ──────────────────────────────────────────────────

#[derive(Default)]
pub struct SpyTransport {
    sent: Mutex<Vec<(String, serde_json::Value)>>,
    failing: AtomicBool,
}

impl SpyTransport {
    pub fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_id(&self) -> CommandId {
        let sent = self.sent.lock().unwrap();
        let (_, payload) = sent.last().unwrap();
        serde_json::from_value(payload["id"].clone()).unwrap()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl CommandTransport for SpyTransport {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), CamlinkError>> + Send {
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(CamlinkError::Transport(Box::new(BrokenPipe)))
        } else {
            let json = serde_json::from_slice(&payload).unwrap();
            self.sent.lock().unwrap().push((topic.to_string(), json));
            Ok(())
        };
        async { result }
    }
}

// ── History ────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryHistory {
    pub statuses: Mutex<Vec<StatusSample>>,
    pub climates: Mutex<Vec<ClimateSample>>,
    pub failing: AtomicBool,
}

impl HistoryStore for InMemoryHistory {
    fn record_status(
        &self,
        sample: StatusSample,
    ) -> impl Future<Output = Result<(), CamlinkError>> + Send {
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(CamlinkError::Storage(Box::new(BrokenPipe)))
        } else {
            self.statuses.lock().unwrap().push(sample);
            Ok(())
        };
        async { result }
    }

    fn record_climate(
        &self,
        sample: ClimateSample,
    ) -> impl Future<Output = Result<(), CamlinkError>> + Send {
        self.climates.lock().unwrap().push(sample);
        async { Ok(()) }
    }
}

// ── Operation log ──────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryLogs {
    pub rows: Mutex<Vec<OperationLog>>,
}

impl InMemoryLogs {
    pub fn all(&self) -> Vec<OperationLog> {
        self.rows.lock().unwrap().clone()
    }
}

impl OperationLogRepository for InMemoryLogs {
    fn create(
        &self,
        log: OperationLog,
    ) -> impl Future<Output = Result<OperationLog, CamlinkError>> + Send {
        self.rows.lock().unwrap().push(log.clone());
        async { Ok(log) }
    }

    fn complete_by_cmd_id(
        &self,
        cmd_id: CommandId,
        ok: bool,
        info: &str,
    ) -> impl Future<Output = Result<Option<OperationLog>, CamlinkError>> + Send {
        let mut rows = self.rows.lock().unwrap();
        let result = rows
            .iter_mut()
            .rev()
            .find(|row| row.cmd_id == Some(cmd_id) && row.outcome == OperationOutcome::Pending)
            .map(|row| {
                row.complete(ok, info);
                row.clone()
            });
        async { Ok(result) }
    }

    fn find_by_cmd_id(
        &self,
        cmd_id: CommandId,
    ) -> impl Future<Output = Result<Option<OperationLog>, CamlinkError>> + Send {
        let rows = self.rows.lock().unwrap();
        let result = rows.iter().rev().find(|row| row.cmd_id == Some(cmd_id)).cloned();
        async { Ok(result) }
    }
}

// ── Automation config ──────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryConfigs {
    store: Mutex<HashMap<String, AutomationConfig>>,
}

impl InMemoryConfigs {
    pub fn with(config: AutomationConfig) -> Self {
        let store = Self::default();
        store
            .store
            .lock()
            .unwrap()
            .insert(config.client_id.clone(), config);
        store
    }
}

impl AutomationConfigRepository for InMemoryConfigs {
    fn get(
        &self,
        client_id: &str,
    ) -> impl Future<Output = Result<Option<AutomationConfig>, CamlinkError>> + Send {
        let result = self.store.lock().unwrap().get(client_id).cloned();
        async { Ok(result) }
    }

    fn save(
        &self,
        config: AutomationConfig,
    ) -> impl Future<Output = Result<AutomationConfig, CamlinkError>> + Send {
        self.store
            .lock()
            .unwrap()
            .insert(config.client_id.clone(), config.clone());
        async { Ok(config) }
    }
}

// ── Events ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<LiveEvent>>,
}

impl RecordingPublisher {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(LiveEvent::kind).collect()
    }

    pub fn events(&self) -> Vec<LiveEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: LiveEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ── Clock ──────────────────────────────────────────────────────

pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        }
    }
}

impl ManualClock {
    pub fn advance_ms(&self, millis: i64) {
        *self.now.lock().unwrap() += TimeDelta::milliseconds(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}
