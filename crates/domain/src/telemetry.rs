//! Inbound payloads other than `status`: replies, climate readings, uploads
//! and configuration reports.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::command::CommandId;

/// Reply to a command, published on `cam/{id}/result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub id: CommandId,
    pub ok: bool,
    #[serde(default)]
    pub info: String,
}

/// Climate reading published on `cam/{id}/dht`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateReading {
    #[serde(default)]
    pub client_id: String,
    pub temperature: f64,
    pub humidity: f64,
    /// `true` when the light sensor reads dark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_dark: Option<bool>,
}

/// Confirmation that a device uploaded an artifact, published on
/// `cam/{id}/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadNotice {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl UploadNotice {
    /// Extract the command id from a `{clientId}_{cmdId}.ext` file name.
    ///
    /// Client ids may themselves contain underscores, so the id is the part
    /// after the last one.
    #[must_use]
    pub fn command_id(&self) -> Option<CommandId> {
        let base = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file_name);
        let stem = base.rsplit_once('.').map_or(base, |(stem, _)| stem);
        let (_, id) = stem.rsplit_once('_')?;
        id.parse().ok()
    }
}

/// Full configuration dump published on `cam/{id}/config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigReport(pub Map<String, Value>);

impl ConfigReport {
    const SECRET_FIELDS: [&'static str; 2] = ["wifiPassword", "password"];

    /// Copy of the report with credentials masked, fit for broadcasting.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut inner = self.0.clone();
        for key in Self::SECRET_FIELDS {
            if let Some(value) = inner.get_mut(key) {
                *value = Value::from("***");
            }
        }
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_result_reply() {
        let reply: CommandReply =
            serde_json::from_str(r#"{"id":123450001,"ok":true,"info":"done"}"#).unwrap();
        assert_eq!(reply.id, CommandId::from_parts(12_345, 1));
        assert!(reply.ok);
        assert_eq!(reply.info, "done");
    }

    #[test]
    fn should_default_info_when_missing() {
        let reply: CommandReply = serde_json::from_str(r#"{"id":5,"ok":false}"#).unwrap();
        assert_eq!(reply.info, "");
    }

    #[test]
    fn should_reject_reply_with_zero_id() {
        let result: Result<CommandReply, _> = serde_json::from_str(r#"{"id":0,"ok":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn should_parse_climate_reading_without_light_flag() {
        let reading: ClimateReading =
            serde_json::from_str(r#"{"clientId":"cam01","temperature":21.5,"humidity":40}"#)
                .unwrap();
        assert!((reading.temperature - 21.5).abs() < f64::EPSILON);
        assert_eq!(reading.light_dark, None);
    }

    #[test]
    fn should_extract_command_id_from_upload_file_name() {
        let notice = UploadNotice {
            file_name: "cam_01_123450042.jpg".to_string(),
            size: Some(2048),
        };
        assert_eq!(notice.command_id(), Some(CommandId::from_parts(12_345, 42)));
    }

    #[test]
    fn should_extract_command_id_when_client_id_contains_dot() {
        let notice = UploadNotice {
            file_name: "cam.01_123450001.jpg".to_string(),
            size: None,
        };
        assert_eq!(notice.command_id(), Some(CommandId::from_parts(12_345, 1)));
    }

    #[test]
    fn should_ignore_directories_in_upload_file_name() {
        let notice = UploadNotice {
            file_name: "uploads/2024/cam01_77.jpg".to_string(),
            size: None,
        };
        assert_eq!(notice.command_id(), Some(CommandId::from_parts(0, 77)));
    }

    #[test]
    fn should_return_none_when_file_name_has_no_command_id() {
        let notice = UploadNotice {
            file_name: "snapshot.jpg".to_string(),
            size: None,
        };
        assert_eq!(notice.command_id(), None);
    }

    #[test]
    fn should_mask_credentials_when_redacting_config() {
        let report: ConfigReport = serde_json::from_str(
            r#"{"clientId":"cam01","wifiSsid":"home","wifiPassword":"hunter2"}"#,
        )
        .unwrap();
        let redacted = report.redacted();
        assert_eq!(redacted.0["wifiPassword"], "***");
        assert_eq!(redacted.0["wifiSsid"], "home");
    }
}
