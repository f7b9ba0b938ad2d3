//! SQLite persistence for measurements and runtime accounting.
//!
//! Three logical records: the append-only probe temperature log, the
//! append-only humidity log, and the `global_state` singleton carrying the
//! cumulative heater-on seconds. Every mutation runs inside an explicit
//! transaction, so a crash mid-call leaves the prior committed value
//! readable.

use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, TypeInfo};
use tracing::debug;

use crate::error::StoreError;
use crate::models::{HumidityReading, ProbeReading};

// ---

/// Cap on rows returned by the raw query pass-through.
const MAX_QUERY_ROWS: usize = 30;

/// Handle on the persisted store. Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one row per probe to the temperature log.
    pub async fn write_temperatures(&self, readings: &[ProbeReading]) -> Result<(), StoreError> {
        // ---
        let mut tx = self.pool.begin().await?;
        for reading in readings {
            sqlx::query(
                r#"
                INSERT INTO probe_temperature (probe_id, temperature, time)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&reading.probe_id)
            .bind(reading.temperature_c)
            .bind(reading.timestamp)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Append one row to the humidity log.
    pub async fn write_humidity(&self, reading: &HumidityReading) -> Result<(), StoreError> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO humidity (temperature, humidity, time)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(reading.temperature_c)
        .bind(reading.relative_humidity)
        .bind(reading.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Read the cumulative heater-on seconds from the singleton row.
    pub async fn heater_seconds(&self) -> Result<i64, StoreError> {
        // ---
        let total: i64 =
            sqlx::query_scalar("SELECT heater_seconds FROM global_state WHERE id = 'global'")
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    /// Overwrite the cumulative heater-on seconds, commit-or-nothing.
    pub async fn set_heater_seconds(&self, total: i64) -> Result<(), StoreError> {
        // ---
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE global_state SET heater_seconds = $1 WHERE id = 'global'")
            .bind(total)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Maintenance reset of the runtime counter back to "never run".
    /// Not called by the control loop.
    pub async fn clear_runtime(&self) -> Result<(), StoreError> {
        // ---
        self.set_heater_seconds(0).await?;
        debug!("Runtime counter cleared");
        Ok(())
    }

    /// Read-only pass-through for the external query console: opaque SQL in,
    /// up to 30 stringified rows out. The controller itself never calls this.
    pub async fn execute_query(&self, sql: &str) -> Result<Vec<String>, StoreError> {
        // ---
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        debug!("Executed [{sql}], {} rows", rows.len());

        let mut lines = Vec::with_capacity(rows.len().min(MAX_QUERY_ROWS));
        for row in rows.iter().take(MAX_QUERY_ROWS) {
            lines.push(format_row(row));
        }
        Ok(lines)
    }
}

/// Render one result row as comma-separated cells, decoding by the column's
/// declared SQLite type and falling back to text.
fn format_row(row: &SqliteRow) -> String {
    // ---
    let mut cells = Vec::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let cell = match column.type_info().name() {
            "INTEGER" => row
                .try_get::<Option<i64>, _>(idx)
                .map(|v| v.map_or_else(|| "NULL".to_string(), |v| v.to_string())),
            "REAL" => row
                .try_get::<Option<f64>, _>(idx)
                .map(|v| v.map_or_else(|| "NULL".to_string(), |v| v.to_string())),
            _ => row
                .try_get::<Option<String>, _>(idx)
                .map(|v| v.unwrap_or_else(|| "NULL".to_string())),
        };
        cells.push(cell.unwrap_or_else(|_| "?".to_string()));
    }
    cells.join(", ")
}
