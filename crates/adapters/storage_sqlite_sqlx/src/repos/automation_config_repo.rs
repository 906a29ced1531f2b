//! `SQLite` implementation of [`AutomationConfigRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use camlink_app::ports::AutomationConfigRepository;
use camlink_domain::automation::AutomationConfig;
use camlink_domain::error::CamlinkError;

use crate::error::StorageError;

struct Wrapper(AutomationConfig);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<AutomationConfig> {
        value.map(|w| w.0)
    }
}

fn decode_unsigned(row: &SqliteRow, column: &str) -> Result<u64, sqlx::Error> {
    let value: i64 = row.try_get(column)?;
    u64::try_from(value).map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(AutomationConfig {
            client_id: row.try_get("client_id")?,
            enabled: row.try_get("enabled")?,
            temp_high: row.try_get("temp_high")?,
            temp_low: row.try_get("temp_low")?,
            humid_high: row.try_get("humid_high")?,
            humid_low: row.try_get("humid_low")?,
            memory_threshold: decode_unsigned(row, "memory_threshold")?,
            rssi_threshold: row.try_get("rssi_threshold")?,
            manual_pause_ms: decode_unsigned(row, "manual_pause_ms")?,
        }))
    }
}

const UPSERT: &str = r"
    INSERT INTO automation_configs (
        client_id, enabled, temp_high, temp_low, humid_high, humid_low,
        memory_threshold, rssi_threshold, manual_pause_ms, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (client_id) DO UPDATE SET
        enabled = excluded.enabled,
        temp_high = excluded.temp_high,
        temp_low = excluded.temp_low,
        humid_high = excluded.humid_high,
        humid_low = excluded.humid_low,
        memory_threshold = excluded.memory_threshold,
        rssi_threshold = excluded.rssi_threshold,
        manual_pause_ms = excluded.manual_pause_ms,
        updated_at = excluded.updated_at
";

const SELECT_BY_CLIENT: &str = "SELECT * FROM automation_configs WHERE client_id = ?";

/// `SQLite`-backed automation configuration store.
pub struct SqliteAutomationConfigRepository {
    pool: SqlitePool,
}

impl SqliteAutomationConfigRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AutomationConfigRepository for SqliteAutomationConfigRepository {
    async fn get(&self, client_id: &str) -> Result<Option<AutomationConfig>, CamlinkError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_CLIENT)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    #[tracing::instrument(skip_all, fields(client_id = %config.client_id))]
    async fn save(&self, config: AutomationConfig) -> Result<AutomationConfig, CamlinkError> {
        sqlx::query(UPSERT)
            .bind(&config.client_id)
            .bind(config.enabled)
            .bind(config.temp_high)
            .bind(config.temp_low)
            .bind(config.humid_high)
            .bind(config.humid_low)
            .bind(i64::try_from(config.memory_threshold).unwrap_or(i64::MAX))
            .bind(config.rssi_threshold)
            .bind(i64::try_from(config.manual_pause_ms).unwrap_or(i64::MAX))
            .bind(crate::time::encode(camlink_domain::time::now()))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(config)
    }
}
