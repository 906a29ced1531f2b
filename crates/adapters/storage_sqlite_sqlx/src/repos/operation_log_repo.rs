//! `SQLite` implementation of [`OperationLogRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use camlink_app::ports::OperationLogRepository;
use camlink_domain::command::CommandId;
use camlink_domain::error::CamlinkError;
use camlink_domain::id::OperationLogId;
use camlink_domain::operation_log::{OperationLog, OperationOutcome};

use crate::error::StorageError;

struct Wrapper(OperationLog);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<OperationLog> {
        value.map(|w| w.0)
    }
}

fn decode_cmd_id(value: Option<i64>) -> Result<Option<CommandId>, sqlx::Error> {
    value
        .map(|raw| {
            let raw = u64::try_from(raw).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
            CommandId::try_from(raw).map_err(|err| sqlx::Error::Decode(Box::new(err)))
        })
        .transpose()
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let outcome: String = row.try_get("outcome")?;
        let cmd_id: Option<i64> = row.try_get("cmd_id")?;
        let created_at: String = row.try_get("created_at")?;

        let outcome: OperationOutcome = outcome
            .parse()
            .map_err(|err: String| sqlx::Error::Decode(err.into()))?;

        Ok(Self(OperationLog {
            id: OperationLogId::from_uuid(id),
            client_id: row.try_get("client_id")?,
            operation: row.try_get("operation")?,
            description: row.try_get("description")?,
            cmd_id: decode_cmd_id(cmd_id)?,
            value: row.try_get("value")?,
            outcome,
            result_message: row.try_get("result_message")?,
            created_at: crate::time::decode(&created_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO operation_logs (id, client_id, operation, description, cmd_id, value, outcome, result_message, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
";

// Only a row that is still pending can be settled; the newest one wins if a
// command id was ever reused.
const COMPLETE_PENDING: &str = r"
    UPDATE operation_logs SET outcome = ?, result_message = ?
    WHERE id = (
        SELECT id FROM operation_logs
        WHERE cmd_id = ? AND outcome = 'pending'
        ORDER BY created_at DESC, rowid DESC
        LIMIT 1
    )
    RETURNING *
";

const SELECT_BY_CMD_ID: &str =
    "SELECT * FROM operation_logs WHERE cmd_id = ? ORDER BY created_at DESC, rowid DESC LIMIT 1";

/// `SQLite`-backed operation log.
pub struct SqliteOperationLogRepository {
    pool: SqlitePool,
}

impl SqliteOperationLogRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl OperationLogRepository for SqliteOperationLogRepository {
    #[tracing::instrument(skip_all, fields(client_id = %log.client_id, operation = %log.operation))]
    async fn create(&self, log: OperationLog) -> Result<OperationLog, CamlinkError> {
        sqlx::query(INSERT)
            .bind(log.id.as_uuid())
            .bind(&log.client_id)
            .bind(&log.operation)
            .bind(&log.description)
            .bind(log.cmd_id.map(|id| i64::from(id.get())))
            .bind(log.value)
            .bind(log.outcome.as_str())
            .bind(log.result_message.as_deref())
            .bind(crate::time::encode(log.created_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(log)
    }

    #[tracing::instrument(skip(self, info))]
    async fn complete_by_cmd_id(
        &self,
        cmd_id: CommandId,
        ok: bool,
        info: &str,
    ) -> Result<Option<OperationLog>, CamlinkError> {
        let outcome = if ok {
            OperationOutcome::Success
        } else {
            OperationOutcome::Failed
        };
        let row: Option<Wrapper> = sqlx::query_as(COMPLETE_PENDING)
            .bind(outcome.as_str())
            .bind(info)
            .bind(i64::from(cmd_id.get()))
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn find_by_cmd_id(&self, cmd_id: CommandId) -> Result<Option<OperationLog>, CamlinkError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_CMD_ID)
            .bind(i64::from(cmd_id.get()))
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }
}
