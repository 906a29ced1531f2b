//! Closed catalogue of operations a device understands.

use std::fmt;

use serde_json::Value;

use crate::error::ValidationError;

/// Image sensor parameter adjustable with a single integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraParam {
    Brightness,
    Contrast,
    Saturation,
    Quality,
    SpecialEffect,
    WhiteBalanceMode,
    AutoExposureLevel,
}

impl CameraParam {
    /// Wire name of the parameter, also used as the `op` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::Quality => "quality",
            Self::SpecialEffect => "special_effect",
            Self::WhiteBalanceMode => "wb_mode",
            Self::AutoExposureLevel => "ae_level",
        }
    }

    /// Inclusive range accepted by the sensor driver.
    #[must_use]
    pub fn range(self) -> (i32, i32) {
        match self {
            Self::Brightness | Self::Contrast | Self::Saturation | Self::AutoExposureLevel => {
                (-2, 2)
            }
            Self::Quality => (0, 63),
            Self::SpecialEffect => (0, 6),
            Self::WhiteBalanceMode => (0, 4),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Saturation => "Saturation",
            Self::Quality => "JPEG quality",
            Self::SpecialEffect => "Special effect",
            Self::WhiteBalanceMode => "White balance mode",
            Self::AutoExposureLevel => "Auto exposure level",
        }
    }
}

/// Which inbound message settles an awaited command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitTarget {
    /// Any `result` message carrying the command id.
    Result,
    /// An upload confirmation naming the command id; only a failed `result`
    /// settles it early.
    Upload,
}

/// Operation carried by a [`Command`](super::Command).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Capture,
    Led { on: bool },
    LedBrightness(u8),
    RedLed { on: bool },
    FrameSize(u8),
    CameraParam { param: CameraParam, value: i32 },
    Servo { angle: u16 },
    FanOn,
    FanOff,
    SetWifi { ssid: String, password: String },
    SetMqtt {
        server: String,
        port: u16,
        client_id: String,
    },
    SetUploadUrl { url: String },
    ResetConfig,
    GetConfig,
    SetDhtInterval { millis: u32 },
    SetStatusInterval { millis: u32 },
}

impl Operation {
    pub const DHT_INTERVAL_MIN_MS: u32 = 1_000;
    pub const DHT_INTERVAL_MAX_MS: u32 = 60_000;
    pub const STATUS_INTERVAL_MIN_MS: u32 = 1_000;
    pub const STATUS_INTERVAL_MAX_MS: u32 = 300_000;
    pub const SERVO_MAX_ANGLE: u16 = 180;

    /// Window servo fully open.
    #[must_use]
    pub fn window_open() -> Self {
        Self::Servo {
            angle: Self::SERVO_MAX_ANGLE,
        }
    }

    /// Window servo fully closed.
    #[must_use]
    pub fn window_closed() -> Self {
        Self::Servo { angle: 0 }
    }

    /// Climate sensor read interval, clamped to what the firmware accepts.
    #[must_use]
    pub fn dht_interval(millis: u32) -> Self {
        Self::SetDhtInterval {
            millis: millis.clamp(Self::DHT_INTERVAL_MIN_MS, Self::DHT_INTERVAL_MAX_MS),
        }
    }

    /// Status report interval, clamped to what the firmware accepts.
    #[must_use]
    pub fn status_interval(millis: u32) -> Self {
        Self::SetStatusInterval {
            millis: millis.clamp(Self::STATUS_INTERVAL_MIN_MS, Self::STATUS_INTERVAL_MAX_MS),
        }
    }

    /// Bring interval values back into their accepted range.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::SetDhtInterval { millis } => Self::dht_interval(millis),
            Self::SetStatusInterval { millis } => Self::status_interval(millis),
            other => other,
        }
    }

    /// Wire name sent in the `op` field.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Led { .. } => "led",
            Self::LedBrightness(_) => "led_brightness",
            Self::RedLed { .. } => "red_led",
            Self::FrameSize(_) => "framesize",
            Self::CameraParam { param, .. } => param.as_str(),
            Self::Servo { .. } => "servo",
            Self::FanOn => "fan_on",
            Self::FanOff => "fan_off",
            Self::SetWifi { .. } => "set_wifi",
            Self::SetMqtt { .. } => "set_mqtt",
            Self::SetUploadUrl { .. } => "set_upload_url",
            Self::ResetConfig => "reset_config",
            Self::GetConfig => "get_config",
            Self::SetDhtInterval { .. } => "set_dht_interval",
            Self::SetStatusInterval { .. } => "set_status_interval",
        }
    }

    /// Integer sent in the `val` field, if the operation takes one.
    #[must_use]
    pub fn value(&self) -> Option<i64> {
        match self {
            Self::Capture => Some(0),
            Self::Led { on } | Self::RedLed { on } => Some(i64::from(*on)),
            Self::LedBrightness(level) | Self::FrameSize(level) => Some(i64::from(*level)),
            Self::CameraParam { value, .. } => Some(i64::from(*value)),
            Self::Servo { angle } => Some(i64::from(*angle)),
            Self::SetDhtInterval { millis } | Self::SetStatusInterval { millis } => {
                Some(i64::from(*millis))
            }
            Self::FanOn
            | Self::FanOff
            | Self::SetWifi { .. }
            | Self::SetMqtt { .. }
            | Self::SetUploadUrl { .. }
            | Self::ResetConfig
            | Self::GetConfig => None,
        }
    }

    /// Additional top-level payload fields.
    #[must_use]
    pub fn extra(&self) -> Vec<(&'static str, Value)> {
        match self {
            Self::SetWifi { ssid, password } => vec![
                ("ssid", Value::from(ssid.as_str())),
                ("password", Value::from(password.as_str())),
            ],
            Self::SetMqtt {
                server,
                port,
                client_id,
            } => vec![
                ("server", Value::from(server.as_str())),
                ("port", Value::from(*port)),
                ("clientId", Value::from(client_id.as_str())),
            ],
            Self::SetUploadUrl { url } => vec![("url", Value::from(url.as_str()))],
            _ => Vec::new(),
        }
    }

    /// What settles this operation when awaited.
    #[must_use]
    pub fn await_target(&self) -> AwaitTarget {
        match self {
            Self::Capture => AwaitTarget::Upload,
            _ => AwaitTarget::Result,
        }
    }

    /// Check value ranges and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] for values the firmware rejects
    /// and [`ValidationError::EmptyField`] for missing configuration strings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::CameraParam { param, value } => {
                let (min, max) = param.range();
                check_range(param.as_str(), i64::from(*value), min.into(), max.into())
            }
            Self::Servo { angle } => check_range(
                "servo angle",
                i64::from(*angle),
                0,
                Self::SERVO_MAX_ANGLE.into(),
            ),
            Self::SetDhtInterval { millis } => check_range(
                "dht interval",
                i64::from(*millis),
                Self::DHT_INTERVAL_MIN_MS.into(),
                Self::DHT_INTERVAL_MAX_MS.into(),
            ),
            Self::SetStatusInterval { millis } => check_range(
                "status interval",
                i64::from(*millis),
                Self::STATUS_INTERVAL_MIN_MS.into(),
                Self::STATUS_INTERVAL_MAX_MS.into(),
            ),
            Self::SetWifi { ssid, .. } => check_non_empty("ssid", ssid),
            Self::SetMqtt {
                server,
                port,
                client_id,
            } => {
                check_non_empty("server", server)?;
                check_non_empty("clientId", client_id)?;
                check_range("port", i64::from(*port), 1, u16::MAX.into())
            }
            Self::SetUploadUrl { url } => check_non_empty("url", url),
            _ => Ok(()),
        }
    }

    /// Human readable description stored in the operation log.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Capture => "Capture and upload photo".to_string(),
            Self::Led { on: true } => "LED on".to_string(),
            Self::Led { on: false } => "LED off".to_string(),
            Self::LedBrightness(level) => format!("LED brightness set to {level}"),
            Self::RedLed { on: true } => "Indicator LED on".to_string(),
            Self::RedLed { on: false } => "Indicator LED off".to_string(),
            Self::FrameSize(size) => match size {
                7 => "Resolution set to 480p".to_string(),
                11 => "Resolution set to 720p".to_string(),
                14 => "Resolution set to 1080p".to_string(),
                other => format!("Resolution set to {other}"),
            },
            Self::CameraParam {
                param: CameraParam::SpecialEffect,
                value,
            } => match value {
                0 => "Special effect: none".to_string(),
                1 => "Special effect: negative".to_string(),
                2 => "Special effect: grayscale".to_string(),
                3 => "Special effect: sepia".to_string(),
                other => format!("Special effect: {other}"),
            },
            Self::CameraParam { param, value } => format!("{} set to {value}", param.label()),
            Self::Servo { angle: 0 } => "Window closed".to_string(),
            Self::Servo { angle } if *angle == Self::SERVO_MAX_ANGLE => "Window opened".to_string(),
            Self::Servo { angle } => format!("Window servo moved to {angle}°"),
            Self::FanOn => "Fan on".to_string(),
            Self::FanOff => "Fan off".to_string(),
            Self::SetWifi { ssid, .. } => format!("Wi-Fi configuration ({ssid})"),
            Self::SetMqtt { server, port, .. } => format!("MQTT configuration ({server}:{port})"),
            Self::SetUploadUrl { .. } => "Upload URL configuration".to_string(),
            Self::ResetConfig => "Reset configuration".to_string(),
            Self::GetConfig => "Query configuration".to_string(),
            Self::SetDhtInterval { millis } => format!("DHT read interval set to {millis} ms"),
            Self::SetStatusInterval { millis } => {
                format!("Status report interval set to {millis} ms")
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

fn check_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField { field })
    } else {
        Ok(())
    }
}
