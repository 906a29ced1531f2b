//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`CamlinkError`]
//! via `From`, so port boundaries only ever see this one enum.

use std::time::Duration;

use crate::command::CommandId;

/// Boxed error coming from an adapter (storage, transport).
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for the camlink workspace.
#[derive(Debug, thiserror::Error)]
pub enum CamlinkError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("timed out")]
    Timeout(#[from] TimeoutError),

    #[error("device reported a failure")]
    Device(#[from] DeviceError),

    #[error("transport error")]
    Transport(#[source] BoxedError),

    #[error("storage error")]
    Storage(#[source] BoxedError),
}

/// A domain invariant was violated while building a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("client id must not be empty")]
    EmptyClientId,

    #[error("client id {0:?} must not contain '/', '+' or '#'")]
    InvalidClientId(String),

    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("low threshold {low} must not exceed high threshold {high} for {field}")]
    InvertedThresholds {
        field: &'static str,
        low: f64,
        high: f64,
    },

    #[error("command id {0} is outside the device id range")]
    CommandIdOutOfRange(u64),
}

/// A looked-up record does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// No reply arrived for an awaited command before its deadline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no reply for command {cmd_id} from {client_id} within {after:?}")]
pub struct TimeoutError {
    pub client_id: String,
    pub cmd_id: CommandId,
    pub after: Duration,
}

/// The device answered an awaited command with `ok = false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("device {client_id} rejected command {cmd_id}: {info}")]
pub struct DeviceError {
    pub client_id: String,
    pub cmd_id: CommandId,
    pub info: String,
}
