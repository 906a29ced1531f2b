//! Storage ports — history, operation log and automation configuration.

use std::future::Future;

use camlink_domain::automation::AutomationConfig;
use camlink_domain::command::CommandId;
use camlink_domain::error::CamlinkError;
use camlink_domain::history::{ClimateSample, StatusSample};
use camlink_domain::operation_log::OperationLog;

/// Append-only store of device samples.
pub trait HistoryStore {
    /// Append one status sample.
    fn record_status(
        &self,
        sample: StatusSample,
    ) -> impl Future<Output = Result<(), CamlinkError>> + Send;

    /// Append one climate sample.
    fn record_climate(
        &self,
        sample: ClimateSample,
    ) -> impl Future<Output = Result<(), CamlinkError>> + Send;
}

/// Repository for [`OperationLog`] rows.
pub trait OperationLogRepository {
    /// Persist a new row.
    fn create(
        &self,
        log: OperationLog,
    ) -> impl Future<Output = Result<OperationLog, CamlinkError>> + Send;

    /// Settle the pending row carrying `cmd_id`.
    ///
    /// Returns `None` when no row for that id is still pending.
    fn complete_by_cmd_id(
        &self,
        cmd_id: CommandId,
        ok: bool,
        info: &str,
    ) -> impl Future<Output = Result<Option<OperationLog>, CamlinkError>> + Send;

    /// Latest row carrying `cmd_id`.
    fn find_by_cmd_id(
        &self,
        cmd_id: CommandId,
    ) -> impl Future<Output = Result<Option<OperationLog>, CamlinkError>> + Send;
}

/// Repository for per-device [`AutomationConfig`].
pub trait AutomationConfigRepository {
    fn get(
        &self,
        client_id: &str,
    ) -> impl Future<Output = Result<Option<AutomationConfig>, CamlinkError>> + Send;

    /// Insert or replace the configuration of `config.client_id`.
    fn save(
        &self,
        config: AutomationConfig,
    ) -> impl Future<Output = Result<AutomationConfig, CamlinkError>> + Send;
}

impl<T: HistoryStore + Send + Sync> HistoryStore for std::sync::Arc<T> {
    fn record_status(
        &self,
        sample: StatusSample,
    ) -> impl Future<Output = Result<(), CamlinkError>> + Send {
        (**self).record_status(sample)
    }

    fn record_climate(
        &self,
        sample: ClimateSample,
    ) -> impl Future<Output = Result<(), CamlinkError>> + Send {
        (**self).record_climate(sample)
    }
}

impl<T: OperationLogRepository + Send + Sync> OperationLogRepository for std::sync::Arc<T> {
    fn create(
        &self,
        log: OperationLog,
    ) -> impl Future<Output = Result<OperationLog, CamlinkError>> + Send {
        (**self).create(log)
    }

    fn complete_by_cmd_id(
        &self,
        cmd_id: CommandId,
        ok: bool,
        info: &str,
    ) -> impl Future<Output = Result<Option<OperationLog>, CamlinkError>> + Send {
        (**self).complete_by_cmd_id(cmd_id, ok, info)
    }

    fn find_by_cmd_id(
        &self,
        cmd_id: CommandId,
    ) -> impl Future<Output = Result<Option<OperationLog>, CamlinkError>> + Send {
        (**self).find_by_cmd_id(cmd_id)
    }
}

impl<T: AutomationConfigRepository + Send + Sync> AutomationConfigRepository
    for std::sync::Arc<T>
{
    fn get(
        &self,
        client_id: &str,
    ) -> impl Future<Output = Result<Option<AutomationConfig>, CamlinkError>> + Send {
        (**self).get(client_id)
    }

    fn save(
        &self,
        config: AutomationConfig,
    ) -> impl Future<Output = Result<AutomationConfig, CamlinkError>> + Send {
        (**self).save(config)
    }
}
