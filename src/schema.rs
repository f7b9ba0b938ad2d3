//! Database schema management for `garlicbox`.
//!
//! Ensures required tables exist before the control loop starts. Applied
//! once on startup from `main.rs`.

use anyhow::Result;
use sqlx::SqlitePool;

// ---

/// Create the database schema (idempotent).
///
/// Creates the append-only measurement logs and the `global_state` singleton
/// holding the cumulative heater-on seconds, seeding the singleton at 0
/// ("never run"). Safe to call on every startup; no-op if objects already
/// exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Append-only temperature probe log
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS probe_temperature (
            probe_id    TEXT NOT NULL,
            temperature REAL NOT NULL,
            time        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Append-only humidity sensor log
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS humidity (
            temperature REAL NOT NULL,
            humidity    REAL NOT NULL,
            time        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Singleton row, read-modify-written only by the runtime accumulator
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS global_state (
            id             TEXT PRIMARY KEY,
            heater_seconds INTEGER NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO global_state (id, heater_seconds) VALUES ('global', 0);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
