//! Hysteresis automation: per-device latches driven by climate and health
//! readings.
//!
//! Everything here is pure. [`AutomationRuntimeState::plan_climate`] and
//! [`AutomationRuntimeState::plan_health`] compute the transitions a reading
//! calls for; the caller sends the matching commands and only then records
//! each one with [`AutomationRuntimeState::apply`]. Latches describe what was
//! last *commanded*, never what the device reports.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::command::Operation;
use crate::error::ValidationError;
use crate::telemetry::ClimateReading;
use crate::time::Timestamp;

/// Per-device thresholds, persisted outside the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationConfig {
    pub client_id: String,
    pub enabled: bool,
    /// Above this temperature (°C) the window opens and the fan starts.
    pub temp_high: f64,
    /// Below this temperature (°C) the window closes and the fan stops.
    pub temp_low: f64,
    pub humid_high: f64,
    pub humid_low: f64,
    /// Free heap in bytes under which the indicator LED lights up.
    pub memory_threshold: u64,
    /// Signal strength in dBm under which the indicator LED lights up.
    pub rssi_threshold: i32,
    /// How long automation stays quiet after a manual command.
    pub manual_pause_ms: u64,
}

impl AutomationConfig {
    /// Configuration used for devices nobody configured: automation off.
    #[must_use]
    pub fn disabled(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            enabled: false,
            temp_high: 30.0,
            temp_low: 18.0,
            humid_high: 80.0,
            humid_low: 30.0,
            memory_threshold: 20_000,
            rssi_threshold: -80,
            manual_pause_ms: 60_000,
        }
    }

    /// Check threshold ordering.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyClientId`],
    /// [`ValidationError::InvalidClientId`] or
    /// [`ValidationError::InvertedThresholds`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        crate::command::validate_client_id(&self.client_id)?;
        if self.temp_low > self.temp_high {
            return Err(ValidationError::InvertedThresholds {
                field: "temperature",
                low: self.temp_low,
                high: self.temp_high,
            });
        }
        if self.humid_low > self.humid_high {
            return Err(ValidationError::InvertedThresholds {
                field: "humidity",
                low: self.humid_low,
                high: self.humid_high,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn manual_pause(&self) -> TimeDelta {
        TimeDelta::milliseconds(i64::try_from(self.manual_pause_ms).unwrap_or(i64::MAX))
    }

    /// Whether a manual command at `last_manual` still silences automation.
    #[must_use]
    pub fn is_paused(&self, last_manual: Option<Timestamp>, now: Timestamp) -> bool {
        last_manual.is_some_and(|at| now - at < self.manual_pause())
    }

    /// Enabled and outside the manual pause window.
    #[must_use]
    pub fn should_evaluate(&self, last_manual: Option<Timestamp>, now: Timestamp) -> bool {
        self.enabled && !self.is_paused(last_manual, now)
    }
}

/// Actuators driven by automation, one latch each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Window,
    Fan,
    Led,
    RedLed,
}

/// A latch flip and the command that realises it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub actuator: Actuator,
    pub on: bool,
    pub operation: Operation,
    pub reason: String,
}

impl Transition {
    fn new(actuator: Actuator, on: bool, reason: String) -> Self {
        let operation = match (actuator, on) {
            (Actuator::Window, true) => Operation::window_open(),
            (Actuator::Window, false) => Operation::window_closed(),
            (Actuator::Fan, true) => Operation::FanOn,
            (Actuator::Fan, false) => Operation::FanOff,
            (Actuator::Led, on) => Operation::Led { on },
            (Actuator::RedLed, on) => Operation::RedLed { on },
        };
        Self {
            actuator,
            on,
            operation,
            reason,
        }
    }
}

/// Last commanded state of each actuator for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRuntimeState {
    pub window_open: bool,
    pub fan_on: bool,
    pub led_on: bool,
    pub red_led_on: bool,
}

impl AutomationRuntimeState {
    #[must_use]
    pub fn latch(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Window => self.window_open,
            Actuator::Fan => self.fan_on,
            Actuator::Led => self.led_on,
            Actuator::RedLed => self.red_led_on,
        }
    }

    /// Record that a transition's command was handed to the transport.
    pub fn apply(&mut self, transition: &Transition) {
        let latch = match transition.actuator {
            Actuator::Window => &mut self.window_open,
            Actuator::Fan => &mut self.fan_on,
            Actuator::Led => &mut self.led_on,
            Actuator::RedLed => &mut self.red_led_on,
        };
        *latch = transition.on;
    }

    /// Transitions called for by a climate reading, in window, fan, light
    /// order.
    #[must_use]
    pub fn plan_climate(
        &self,
        config: &AutomationConfig,
        reading: &ClimateReading,
    ) -> Vec<Transition> {
        let temperature = reading.temperature;
        let humidity = reading.humidity;

        let mut open_window = false;
        let mut close_window = false;
        let mut fan_on = false;
        let mut fan_off = false;

        if temperature > config.temp_high {
            open_window = true;
            fan_on = true;
        } else if temperature < config.temp_low {
            close_window = true;
            fan_off = true;
        }

        if humidity > config.humid_high {
            open_window = true;
        } else if humidity < config.humid_low && !open_window {
            close_window = true;
        }

        let mut transitions = Vec::new();

        if open_window && !self.window_open {
            transitions.push(Transition::new(
                Actuator::Window,
                true,
                format!("Open window (temperature {temperature}℃, humidity {humidity}%)"),
            ));
        } else if close_window && !open_window && self.window_open {
            transitions.push(Transition::new(
                Actuator::Window,
                false,
                format!("Close window (temperature {temperature}℃, humidity {humidity}%)"),
            ));
        }

        if fan_on && !self.fan_on {
            transitions.push(Transition::new(
                Actuator::Fan,
                true,
                format!("Fan on (temperature {temperature}℃)"),
            ));
        } else if fan_off && self.fan_on {
            transitions.push(Transition::new(
                Actuator::Fan,
                false,
                format!("Fan off (temperature {temperature}℃)"),
            ));
        }

        match reading.light_dark {
            Some(true) if !self.led_on => transitions.push(Transition::new(
                Actuator::Led,
                true,
                "Light on (surroundings dark)".to_string(),
            )),
            Some(false) if self.led_on => transitions.push(Transition::new(
                Actuator::Led,
                false,
                "Light off (surroundings bright)".to_string(),
            )),
            _ => {}
        }

        transitions
    }

    /// Transition of the indicator LED called for by a status report.
    #[must_use]
    pub fn plan_health(
        &self,
        config: &AutomationConfig,
        free_heap: u64,
        rssi: i32,
    ) -> Option<Transition> {
        let low_memory = free_heap < config.memory_threshold;
        let weak_signal = rssi < config.rssi_threshold;
        let warning = low_memory || weak_signal;

        if warning && !self.red_led_on {
            let mut causes = Vec::with_capacity(2);
            if low_memory {
                causes.push(format!("low memory {}KB", free_heap / 1024));
            }
            if weak_signal {
                causes.push(format!("weak signal {rssi}dBm"));
            }
            Some(Transition::new(
                Actuator::RedLed,
                true,
                format!("Indicator LED on ({})", causes.join(", ")),
            ))
        } else if !warning && self.red_led_on {
            Some(Transition::new(
                Actuator::RedLed,
                false,
                "Indicator LED off (status normal)".to_string(),
            ))
        } else {
            None
        }
    }
}
