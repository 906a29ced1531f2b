//! Events pushed to live subscribers.

use serde::Serialize;
use serde_json::Value;

use crate::command::CommandId;
use crate::device::DeviceState;
use crate::history::ClimateSample;
use crate::operation_log::OperationLog;
use crate::telemetry::ConfigReport;
use crate::time::Timestamp;

/// Something subscribers want to see as it happens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum LiveEvent {
    /// First event of every subscription.
    Connected { at: Timestamp },
    Status {
        #[serde(rename = "clientId")]
        client_id: String,
        state: DeviceState,
    },
    Dht(ClimateSample),
    Config {
        #[serde(rename = "clientId")]
        client_id: String,
        report: ConfigReport,
    },
    Log(OperationLog),
    Capture {
        #[serde(rename = "clientId")]
        client_id: String,
        #[serde(rename = "cmdId")]
        cmd_id: Option<CommandId>,
        #[serde(rename = "fileName")]
        file_name: String,
    },
}

impl LiveEvent {
    /// Event name used on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Status { .. } => "status",
            Self::Dht(_) => "dht",
            Self::Config { .. } => "config",
            Self::Log(_) => "log",
            Self::Capture { .. } => "capture",
        }
    }

    /// The event body without its kind tag.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which only happens for non-finite
    /// floating point readings.
    pub fn data(&self) -> Result<Value, serde_json::Error> {
        let mut tagged = serde_json::to_value(self)?;
        Ok(tagged
            .get_mut("data")
            .map(Value::take)
            .unwrap_or_default())
    }
}
