//! Outbound commands: correlation id, operation catalogue, wire payload.

mod id;
mod operation;

pub use id::CommandId;
pub use operation::{AwaitTarget, CameraParam, Operation};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CamlinkError, ValidationError};
use crate::time::Timestamp;

/// Who asked for a command.
///
/// Only [`Origin::Manual`] commands refresh the manual pause window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Manual,
    Automation,
    System,
}

/// A validated command addressed to one device. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub id: CommandId,
    pub client_id: String,
    pub operation: Operation,
    pub issued_at: Timestamp,
}

impl Command {
    /// Build a command with a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns [`CamlinkError::Validation`] when the client id is empty or the
    /// operation carries an out-of-range value.
    pub fn new(client_id: impl Into<String>, operation: Operation) -> Result<Self, CamlinkError> {
        Self::with_id(
            CommandId::generate(),
            client_id,
            operation,
            crate::time::now(),
        )
    }

    /// Build a command with an explicit id and issue time.
    ///
    /// # Errors
    ///
    /// Same as [`Command::new`].
    pub fn with_id(
        id: CommandId,
        client_id: impl Into<String>,
        operation: Operation,
        issued_at: Timestamp,
    ) -> Result<Self, CamlinkError> {
        let client_id = client_id.into();
        validate_client_id(&client_id)?;
        let operation = operation.normalized();
        operation.validate()?;
        Ok(Self {
            id,
            client_id,
            operation,
            issued_at,
        })
    }

    /// Topic the command is published on.
    #[must_use]
    pub fn topic(&self) -> String {
        command_topic(&self.client_id)
    }

    /// JSON object `{id, op, val?, ...extra}` understood by the firmware.
    #[must_use]
    pub fn payload(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".into(), Value::from(self.id.get()));
        map.insert("op".into(), Value::from(self.operation.name()));
        if let Some(val) = self.operation.value() {
            map.insert("val".into(), Value::from(val));
        }
        for (key, value) in self.operation.extra() {
            map.insert(key.into(), value);
        }
        Value::Object(map)
    }

    /// Serialized payload bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.payload().to_string().into_bytes()
    }
}

/// A client id becomes one topic level, so it must be non-empty and free of
/// the level separator and wildcards.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyClientId`] or
/// [`ValidationError::InvalidClientId`].
pub fn validate_client_id(client_id: &str) -> Result<(), ValidationError> {
    if client_id.trim().is_empty() {
        return Err(ValidationError::EmptyClientId);
    }
    if client_id.contains(['/', '+', '#']) {
        return Err(ValidationError::InvalidClientId(client_id.to_string()));
    }
    Ok(())
}

/// Outbound topic for a device.
#[must_use]
pub fn command_topic(client_id: &str) -> String {
    format!("cam/{client_id}/cmd")
}
