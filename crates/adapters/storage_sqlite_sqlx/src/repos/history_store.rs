//! `SQLite` implementation of [`HistoryStore`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use camlink_app::ports::HistoryStore;
use camlink_domain::error::CamlinkError;
use camlink_domain::history::{ClimateSample, StatusSample};

use crate::error::StorageError;

struct StatusWrapper(StatusSample);

impl<'r> FromRow<'r, SqliteRow> for StatusWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let free_heap: Option<i64> = row.try_get("free_heap")?;
        let uptime: Option<i64> = row.try_get("uptime")?;
        let recorded_at: String = row.try_get("recorded_at")?;

        Ok(Self(StatusSample {
            client_id: row.try_get("client_id")?,
            rssi: row.try_get("rssi")?,
            free_heap: free_heap.and_then(|v| u64::try_from(v).ok()),
            uptime: uptime.and_then(|v| u64::try_from(v).ok()),
            recorded_at: crate::time::decode(&recorded_at)?,
        }))
    }
}

struct ClimateWrapper(ClimateSample);

impl<'r> FromRow<'r, SqliteRow> for ClimateWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let recorded_at: String = row.try_get("recorded_at")?;

        Ok(Self(ClimateSample {
            client_id: row.try_get("client_id")?,
            temperature: row.try_get("temperature")?,
            humidity: row.try_get("humidity")?,
            light_dark: row.try_get("light_dark")?,
            recorded_at: crate::time::decode(&recorded_at)?,
        }))
    }
}

const INSERT_STATUS: &str = r"
    INSERT INTO status_history (client_id, rssi, free_heap, uptime, recorded_at)
    VALUES (?, ?, ?, ?, ?)
";
const INSERT_CLIMATE: &str = r"
    INSERT INTO climate_history (client_id, temperature, humidity, light_dark, recorded_at)
    VALUES (?, ?, ?, ?, ?)
";
const SELECT_STATUS: &str =
    "SELECT * FROM status_history WHERE client_id = ? ORDER BY recorded_at DESC, id DESC LIMIT ?";
const SELECT_CLIMATE: &str =
    "SELECT * FROM climate_history WHERE client_id = ? ORDER BY recorded_at DESC, id DESC LIMIT ?";

fn to_sql_int(value: Option<u64>) -> Option<i64> {
    value.map(|v| i64::try_from(v).unwrap_or(i64::MAX))
}

/// `SQLite`-backed history of status and climate samples.
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent status samples of a device, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CamlinkError::Storage`] if the query fails.
    pub async fn recent_status(
        &self,
        client_id: &str,
        limit: usize,
    ) -> Result<Vec<StatusSample>, CamlinkError> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let rows: Vec<StatusWrapper> = sqlx::query_as(SELECT_STATUS)
            .bind(client_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    /// Most recent climate samples of a device, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CamlinkError::Storage`] if the query fails.
    pub async fn recent_climate(
        &self,
        client_id: &str,
        limit: usize,
    ) -> Result<Vec<ClimateSample>, CamlinkError> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let rows: Vec<ClimateWrapper> = sqlx::query_as(SELECT_CLIMATE)
            .bind(client_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

impl HistoryStore for SqliteHistoryStore {
    async fn record_status(&self, sample: StatusSample) -> Result<(), CamlinkError> {
        sqlx::query(INSERT_STATUS)
            .bind(&sample.client_id)
            .bind(sample.rssi)
            .bind(to_sql_int(sample.free_heap))
            .bind(to_sql_int(sample.uptime))
            .bind(crate::time::encode(sample.recorded_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn record_climate(&self, sample: ClimateSample) -> Result<(), CamlinkError> {
        sqlx::query(INSERT_CLIMATE)
            .bind(&sample.client_id)
            .bind(sample.temperature)
            .bind(sample.humidity)
            .bind(sample.light_dark)
            .bind(crate::time::encode(sample.recorded_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}
