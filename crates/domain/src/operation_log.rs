//! Audit trail of commands sent to devices.

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandId, Operation};
use crate::id::OperationLogId;
use crate::time::Timestamp;

/// Operation name used for rows written by the automation engine.
pub const AUTOMATION_OPERATION: &str = "auto_cmd";

/// Lifecycle of a logged command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationOutcome {
    Pending,
    Success,
    Failed,
}

impl OperationOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown operation outcome {other:?}")),
        }
    }
}

/// One audit row.
///
/// Automation rows carry no command id; their outcome is known at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLog {
    pub id: OperationLogId,
    pub client_id: String,
    pub operation: String,
    pub description: String,
    pub cmd_id: Option<CommandId>,
    pub value: Option<i64>,
    pub outcome: OperationOutcome,
    pub result_message: Option<String>,
    pub created_at: Timestamp,
}

impl OperationLog {
    /// Row for a command that was just published.
    #[must_use]
    pub fn pending(command: &Command) -> Self {
        Self {
            id: OperationLogId::new(),
            client_id: command.client_id.clone(),
            operation: command.operation.name().to_string(),
            description: command.operation.describe(),
            cmd_id: Some(command.id),
            value: command.operation.value(),
            outcome: OperationOutcome::Pending,
            result_message: None,
            created_at: command.issued_at,
        }
    }

    /// Row for a command issued by the automation engine.
    #[must_use]
    pub fn automated(
        client_id: impl Into<String>,
        operation: &Operation,
        reason: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        let reason = reason.into();
        Self {
            id: OperationLogId::new(),
            client_id: client_id.into(),
            operation: AUTOMATION_OPERATION.to_string(),
            description: format!("Automation: {reason}"),
            cmd_id: None,
            value: operation.value(),
            outcome: OperationOutcome::Success,
            result_message: Some(reason),
            created_at,
        }
    }

    /// Apply a device reply.
    pub fn complete(&mut self, ok: bool, info: impl Into<String>) {
        self.outcome = if ok {
            OperationOutcome::Success
        } else {
            OperationOutcome::Failed
        };
        self.result_message = Some(info.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        Command::with_id(
            CommandId::from_parts(1, 1),
            "D1",
            Operation::Led { on: true },
            crate::time::now(),
        )
        .unwrap()
    }

    #[test]
    fn should_start_pending_with_command_details() {
        let log = OperationLog::pending(&command());
        assert_eq!(log.outcome, OperationOutcome::Pending);
        assert_eq!(log.operation, "led");
        assert_eq!(log.description, "LED on");
        assert_eq!(log.cmd_id, Some(CommandId::from_parts(1, 1)));
        assert_eq!(log.value, Some(1));
    }

    #[test]
    fn should_mark_failed_when_completed_with_error() {
        let mut log = OperationLog::pending(&command());
        log.complete(false, "camera busy");
        assert_eq!(log.outcome, OperationOutcome::Failed);
        assert_eq!(log.result_message.as_deref(), Some("camera busy"));
    }

    #[test]
    fn should_record_automation_rows_as_successful_without_cmd_id() {
        let log = OperationLog::automated(
            "D1",
            &Operation::FanOn,
            "Fan on (temperature 31℃)",
            crate::time::now(),
        );
        assert_eq!(log.operation, AUTOMATION_OPERATION);
        assert_eq!(log.outcome, OperationOutcome::Success);
        assert_eq!(log.cmd_id, None);
        assert_eq!(log.description, "Automation: Fan on (temperature 31℃)");
    }

    #[test]
    fn should_parse_outcome_from_its_display_form() {
        for outcome in [
            OperationOutcome::Pending,
            OperationOutcome::Success,
            OperationOutcome::Failed,
        ] {
            assert_eq!(outcome.to_string().parse::<OperationOutcome>(), Ok(outcome));
        }
        assert!("done".parse::<OperationOutcome>().is_err());
    }
}
