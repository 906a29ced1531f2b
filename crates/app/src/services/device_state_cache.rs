//! Device state cache — latest status per device plus the side effects of
//! every observation (history, live events).

use dashmap::DashMap;

use camlink_domain::device::{DeviceState, DeviceStatus, StatusView};
use camlink_domain::error::CamlinkError;
use camlink_domain::event::LiveEvent;
use camlink_domain::history::{ClimateSample, StatusSample};
use camlink_domain::telemetry::{ClimateReading, ConfigReport};

use crate::ports::{Clock, EventPublisher, HistoryStore};

/// Holds the last status of every device seen since startup.
///
/// A status replaces the previous record of that device as a whole. The
/// cache is updated and the event published before history is written, so a
/// failing history store never hides a fresh status.
pub struct DeviceStateCache<H, P, C> {
    states: DashMap<String, DeviceState>,
    history: H,
    publisher: P,
    clock: C,
}

impl<H, P, C> DeviceStateCache<H, P, C>
where
    H: HistoryStore + Send + Sync,
    P: EventPublisher + Send + Sync,
    C: Clock + Send + Sync,
{
    pub fn new(history: H, publisher: P, clock: C) -> Self {
        Self {
            states: DashMap::new(),
            history,
            publisher,
            clock,
        }
    }

    /// Replace the cached status of `client_id` and stamp it with now.
    ///
    /// # Errors
    ///
    /// Returns the history store error. The cache and subscribers are
    /// already updated when that happens.
    #[tracing::instrument(skip(self, status))]
    pub async fn upsert(
        &self,
        client_id: &str,
        mut status: DeviceStatus,
    ) -> Result<DeviceState, CamlinkError> {
        client_id.clone_into(&mut status.client_id);
        let state = DeviceState::new(status, self.clock.now());
        self.states.insert(client_id.to_string(), state.clone());
        self.publisher.publish(LiveEvent::Status {
            client_id: client_id.to_string(),
            state: state.clone(),
        });
        self.history
            .record_status(StatusSample::from_state(client_id, &state))
            .await?;
        Ok(state)
    }

    /// Cached state of a device, `None` when it never reported.
    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<DeviceState> {
        self.states.get(client_id).map(|entry| entry.value().clone())
    }

    /// Found/online view of a device for status queries.
    #[must_use]
    pub fn status_view(&self, client_id: &str) -> StatusView {
        StatusView::new(client_id, self.get(client_id), self.clock.now())
    }

    /// Every device that reported at least once.
    #[must_use]
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.states.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Broadcast and store a climate reading.
    ///
    /// # Errors
    ///
    /// Returns the history store error after the event went out.
    #[tracing::instrument(skip(self, reading))]
    pub async fn record_climate(
        &self,
        client_id: &str,
        reading: &ClimateReading,
    ) -> Result<ClimateSample, CamlinkError> {
        let sample = ClimateSample::new(client_id, reading, self.clock.now());
        self.publisher.publish(LiveEvent::Dht(sample.clone()));
        self.history.record_climate(sample.clone()).await?;
        Ok(sample)
    }

    /// Broadcast a configuration report with credentials masked.
    pub fn report_config(&self, client_id: &str, report: &ConfigReport) {
        self.publisher.publish(LiveEvent::Config {
            client_id: client_id.to_string(),
            report: report.redacted(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryHistory, ManualClock, RecordingPublisher};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    type Cache =
        DeviceStateCache<Arc<InMemoryHistory>, Arc<RecordingPublisher>, Arc<ManualClock>>;

    struct Fixture {
        cache: Cache,
        history: Arc<InMemoryHistory>,
        publisher: Arc<RecordingPublisher>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let history = Arc::new(InMemoryHistory::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let clock = Arc::new(ManualClock::default());
        Fixture {
            cache: DeviceStateCache::new(
                Arc::clone(&history),
                Arc::clone(&publisher),
                Arc::clone(&clock),
            ),
            history,
            publisher,
            clock,
        }
    }

    fn status(rssi: i32) -> DeviceStatus {
        DeviceStatus {
            rssi: Some(rssi),
            free_heap: Some(40_000),
            ..DeviceStatus::default()
        }
    }

    #[tokio::test]
    async fn should_return_none_when_device_never_reported() {
        let f = fixture();
        assert!(f.cache.get("cam01").is_none());
        assert!(!f.cache.status_view("cam01").found);
    }

    #[tokio::test]
    async fn should_replace_whole_record_when_upserting() {
        let f = fixture();
        let mut first = status(-60);
        first.led_status = Some(true);
        f.cache.upsert("cam01", first).await.unwrap();
        f.cache.upsert("cam01", status(-70)).await.unwrap();

        let state = f.cache.get("cam01").unwrap();
        assert_eq!(state.status.rssi, Some(-70));
        assert_eq!(state.status.led_status, None);
    }

    #[tokio::test]
    async fn should_use_topic_client_id_over_payload() {
        let f = fixture();
        let mut payload = status(-60);
        payload.client_id = "other".to_string();
        let state = f.cache.upsert("cam01", payload).await.unwrap();
        assert_eq!(state.status.client_id, "cam01");
    }

    #[tokio::test]
    async fn should_broadcast_and_record_history_on_upsert() {
        let f = fixture();
        f.cache.upsert("cam01", status(-60)).await.unwrap();
        assert_eq!(f.publisher.kinds(), vec!["status"]);
        assert_eq!(f.history.statuses.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_keep_cached_state_when_history_fails() {
        let f = fixture();
        f.history.failing.store(true, Ordering::SeqCst);
        let result = f.cache.upsert("cam01", status(-60)).await;
        assert!(matches!(result, Err(CamlinkError::Storage(_))));
        assert!(f.cache.get("cam01").is_some());
        assert_eq!(f.publisher.kinds(), vec!["status"]);
    }

    #[tokio::test]
    async fn should_go_offline_after_sixty_seconds_without_status() {
        let f = fixture();
        f.cache.upsert("cam01", status(-60)).await.unwrap();
        f.clock.advance_ms(59_000);
        assert!(f.cache.status_view("cam01").online);
        f.clock.advance_ms(2_000);
        let view = f.cache.status_view("cam01");
        assert!(view.found);
        assert!(!view.online);
    }

    #[tokio::test]
    async fn should_store_and_broadcast_climate_reading() {
        let f = fixture();
        let reading = ClimateReading {
            client_id: "cam01".to_string(),
            temperature: 22.0,
            humidity: 45.0,
            light_dark: None,
        };
        f.cache.record_climate("cam01", &reading).await.unwrap();
        assert_eq!(f.publisher.kinds(), vec!["dht"]);
        assert_eq!(f.history.climates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_redact_config_report_before_broadcasting() {
        let f = fixture();
        let report: ConfigReport =
            serde_json::from_str(r#"{"wifiSsid":"home","wifiPassword":"hunter2"}"#).unwrap();
        f.cache.report_config("cam01", &report);
        let events = f.publisher.events();
        let LiveEvent::Config { report, .. } = &events[0] else {
            panic!("expected config event");
        };
        assert_eq!(report.0["wifiPassword"], "***");
    }

    #[tokio::test]
    async fn should_list_reporting_devices_sorted() {
        let f = fixture();
        f.cache.upsert("cam02", status(-60)).await.unwrap();
        f.cache.upsert("cam01", status(-60)).await.unwrap();
        assert_eq!(f.cache.device_ids(), vec!["cam01", "cam02"]);
    }
}
