//! Samples appended to the external history store.

use serde::{Deserialize, Serialize};

use crate::device::DeviceState;
use crate::telemetry::ClimateReading;
use crate::time::Timestamp;

/// Health figures extracted from a status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSample {
    pub client_id: String,
    pub rssi: Option<i32>,
    pub free_heap: Option<u64>,
    pub uptime: Option<u64>,
    pub recorded_at: Timestamp,
}

impl StatusSample {
    #[must_use]
    pub fn from_state(client_id: impl Into<String>, state: &DeviceState) -> Self {
        Self {
            client_id: client_id.into(),
            rssi: state.status.rssi,
            free_heap: state.status.free_heap,
            uptime: state.status.uptime,
            recorded_at: state.last_update_time,
        }
    }
}

/// One climate reading with its reception time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateSample {
    pub client_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub light_dark: Option<bool>,
    pub recorded_at: Timestamp,
}

impl ClimateSample {
    #[must_use]
    pub fn new(client_id: impl Into<String>, reading: &ClimateReading, recorded_at: Timestamp) -> Self {
        Self {
            client_id: client_id.into(),
            temperature: reading.temperature,
            humidity: reading.humidity,
            light_dark: reading.light_dark,
            recorded_at,
        }
    }
}
