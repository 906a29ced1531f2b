//! Automation engine — turns climate and health readings into actuator
//! commands.
//!
//! Decisions come from [`AutomationRuntimeState`]; this module adds the
//! gates (enabled flag, manual pause window), per-device serialisation and
//! the rule that a latch only moves once its command was handed to the
//! transport.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use camlink_domain::automation::{AutomationConfig, AutomationRuntimeState, Transition};
use camlink_domain::error::CamlinkError;
use camlink_domain::telemetry::ClimateReading;

use crate::ports::{
    AutomationConfigRepository, Clock, CommandTransport, EventPublisher, OperationLogRepository,
};
use crate::services::command_dispatcher::CommandDispatcher;

/// Hysteresis engine, one latch set per device.
///
/// Evaluations for the same device run one at a time; different devices
/// are evaluated in parallel.
pub struct AutomationEngine<R, T, L, P, C> {
    configs: R,
    dispatcher: Arc<CommandDispatcher<T, L, P, C>>,
    latches: DashMap<String, Arc<Mutex<AutomationRuntimeState>>>,
}

impl<R, T, L, P, C> AutomationEngine<R, T, L, P, C>
where
    R: AutomationConfigRepository + Send + Sync,
    T: CommandTransport + Send + Sync,
    L: OperationLogRepository + Send + Sync,
    P: EventPublisher + Send + Sync,
    C: Clock + Send + Sync,
{
    /// Create a new engine.
    pub fn new(configs: R, dispatcher: Arc<CommandDispatcher<T, L, P, C>>) -> Self {
        Self {
            configs,
            dispatcher,
            latches: DashMap::new(),
        }
    }

    /// Configuration of a device; devices without one are disabled.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the repository.
    pub async fn load_config(&self, client_id: &str) -> Result<AutomationConfig, CamlinkError> {
        Ok(self
            .configs
            .get(client_id)
            .await?
            .unwrap_or_else(|| AutomationConfig::disabled(client_id)))
    }

    /// Validate and store a device configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CamlinkError::Validation`] for inverted thresholds or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self, config), fields(client_id = %config.client_id))]
    pub async fn save_config(
        &self,
        config: AutomationConfig,
    ) -> Result<AutomationConfig, CamlinkError> {
        config.validate()?;
        self.configs.save(config).await
    }

    /// Evaluate a climate reading. Returns the transitions that were sent.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the configuration cannot be loaded.
    /// Send failures are logged and leave the latch untouched.
    #[tracing::instrument(skip(self, reading))]
    pub async fn on_climate(
        &self,
        client_id: &str,
        reading: &ClimateReading,
    ) -> Result<Vec<Transition>, CamlinkError> {
        let Some(config) = self.active_config(client_id).await? else {
            return Ok(Vec::new());
        };
        let latch = self.latch(client_id);
        let mut state = latch.lock().await;
        let planned = state.plan_climate(&config, reading);
        let mut sent = Vec::with_capacity(planned.len());
        for transition in planned {
            if self.execute(client_id, &mut state, &transition).await {
                sent.push(transition);
            }
        }
        Ok(sent)
    }

    /// Evaluate free heap and signal strength from a status report.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the configuration cannot be loaded.
    #[tracing::instrument(skip(self))]
    pub async fn on_health(
        &self,
        client_id: &str,
        free_heap: u64,
        rssi: i32,
    ) -> Result<Option<Transition>, CamlinkError> {
        let Some(config) = self.active_config(client_id).await? else {
            return Ok(None);
        };
        let latch = self.latch(client_id);
        let mut state = latch.lock().await;
        let Some(transition) = state.plan_health(&config, free_heap, rssi) else {
            return Ok(None);
        };
        let sent = self.execute(client_id, &mut state, &transition).await;
        Ok(sent.then_some(transition))
    }

    /// Snapshot of a device's latches, `None` before its first evaluation.
    pub async fn runtime_state(&self, client_id: &str) -> Option<AutomationRuntimeState> {
        let latch = self
            .latches
            .get(client_id)
            .map(|entry| Arc::clone(entry.value()))?;
        let state = latch.lock().await;
        Some(state.clone())
    }

    async fn active_config(
        &self,
        client_id: &str,
    ) -> Result<Option<AutomationConfig>, CamlinkError> {
        let config = self.load_config(client_id).await?;
        let last_manual = self.dispatcher.last_manual(client_id);
        if config.should_evaluate(last_manual, self.dispatcher.now()) {
            Ok(Some(config))
        } else {
            tracing::debug!(enabled = config.enabled, "automation inactive, skipping");
            Ok(None)
        }
    }

    fn latch(&self, client_id: &str) -> Arc<Mutex<AutomationRuntimeState>> {
        let entry = self.latches.entry(client_id.to_string()).or_default();
        Arc::clone(entry.value())
    }

    async fn execute(
        &self,
        client_id: &str,
        state: &mut AutomationRuntimeState,
        transition: &Transition,
    ) -> bool {
        match self.dispatcher.dispatch_automated(client_id, transition).await {
            Ok(_) => {
                state.apply(transition);
                true
            }
            Err(err) => {
                tracing::warn!(
                    actuator = ?transition.actuator,
                    error = %err,
                    "automation command not sent, latch kept"
                );
                false
            }
        }
    }
}
