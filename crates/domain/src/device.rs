//! Device snapshot reported on the `status` topic and the cached view of it.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::Timestamp;

/// A device is online while its last status is younger than this.
pub const ONLINE_WINDOW: TimeDelta = TimeDelta::seconds(60);

/// Scalar fields published by a device on `cam/{id}/status`.
///
/// Known fields are typed; anything else the firmware adds is kept verbatim
/// in [`extra`](Self::extra).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_heap: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub led_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub led_brightness: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red_led_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servo_angle: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framesize: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Latest status of one device plus when it was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    #[serde(flatten)]
    pub status: DeviceStatus,
    pub last_update_time: Timestamp,
}

impl DeviceState {
    #[must_use]
    pub fn new(status: DeviceStatus, last_update_time: Timestamp) -> Self {
        Self {
            status,
            last_update_time,
        }
    }

    /// Whether the device reported within [`ONLINE_WINDOW`] of `now`.
    #[must_use]
    pub fn is_online_at(&self, now: Timestamp) -> bool {
        now - self.last_update_time < ONLINE_WINDOW
    }
}

/// Answer to a status query for one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub client_id: String,
    pub found: bool,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<DeviceState>,
}

impl StatusView {
    /// Build the view from an optional cached state.
    #[must_use]
    pub fn new(client_id: impl Into<String>, state: Option<DeviceState>, now: Timestamp) -> Self {
        let online = state.as_ref().is_some_and(|s| s.is_online_at(now));
        Self {
            client_id: client_id.into(),
            found: state.is_some(),
            online,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn should_be_online_when_last_update_is_59_seconds_old() {
        let state = DeviceState::new(DeviceStatus::default(), at(0));
        assert!(state.is_online_at(at(59)));
    }

    #[test]
    fn should_be_offline_when_last_update_is_61_seconds_old() {
        let state = DeviceState::new(DeviceStatus::default(), at(0));
        assert!(!state.is_online_at(at(61)));
    }

    #[test]
    fn should_parse_firmware_status_payload() {
        let payload = r#"{"clientId":"cam01","uptime":120,"freeHeap":81234,"rssi":-67,
            "ledStatus":true,"ledBrightness":128,"redLedStatus":false,"servoAngle":90,
            "framesize":11}"#;
        let status: DeviceStatus = serde_json::from_str(payload).unwrap();
        assert_eq!(status.client_id, "cam01");
        assert_eq!(status.free_heap, Some(81_234));
        assert_eq!(status.rssi, Some(-67));
        assert_eq!(status.led_status, Some(true));
        assert_eq!(status.servo_angle, Some(90));
        assert!(status.extra.is_empty());
    }

    #[test]
    fn should_keep_unknown_fields_in_extra() {
        let status: DeviceStatus =
            serde_json::from_str(r#"{"clientId":"cam01","psram":4096}"#).unwrap();
        assert_eq!(status.extra.get("psram"), Some(&Value::from(4096)));
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["psram"], 4096);
    }

    #[test]
    fn should_report_not_found_when_state_is_missing() {
        let view = StatusView::new("cam01", None, at(0));
        assert!(!view.found);
        assert!(!view.online);
    }

    #[test]
    fn should_report_online_when_state_is_fresh() {
        let state = DeviceState::new(DeviceStatus::default(), at(0));
        let view = StatusView::new("cam01", Some(state), at(10));
        assert!(view.found);
        assert!(view.online);
    }
}
