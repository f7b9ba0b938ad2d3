//! Application entry point for the `garlicbox` controller.
//!
//! This binary orchestrates the full startup sequence for the curing box:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the SQLite store and creating the schema if it does not exist
//! - Wiring the sensor and relay capabilities (the bundled bench simulator;
//!   physical drivers implement the same traits out of tree)
//! - Running the supervisor loop until interrupt or fatal fault
//! - Always finishing with the shutdown/cooldown sequence before exit
//!
//! # Environment Variables
//! - `DATABASE_URL` (optional) – SQLite connection string
//! - `MIN_TEMP` / `MAX_TEMP` (optional) – hysteresis band in °C
//! - `EXPECTED_PROBES` (optional) – probe count for the startup sanity check
//! - `HUMIDITY_ALERT_FLOOR` (optional) – low-humidity warning level in %
//! - `GARLICBOX_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `GARLICBOX_SPAN_EVENTS` (optional) – span event mode for tracing
use std::{env, io::IsTerminal};

use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

use garlicbox::fans::FanController;
use garlicbox::runtime::RuntimeAccumulator;
use garlicbox::sensors::SensorAggregator;
use garlicbox::sim::SimulatedBox;
use garlicbox::store::Store;
use garlicbox::supervisor::Supervisor;
use garlicbox::thermostat::ThermostatController;
use garlicbox::{config, schema};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    tracing::info!("Attempting to open database: {}", cfg.db_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&cfg.db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open database '{}': {}", cfg.db_url, e))?;

    tracing::info!("Successfully opened database");

    schema::create_schema(&pool).await?;
    let store = Store::new(pool);

    // Bench simulator behind the hardware traits; a deployment with the real
    // box swaps in the DS18B20/DHT20/relay drivers here.
    let enclosure = SimulatedBox::new(60.0, 20.0);

    let now = chrono::Utc::now();
    let sensors = SensorAggregator::new(enclosure.probes(), enclosure.humidity_sensor());
    let thermostat = ThermostatController::new(
        cfg.thresholds,
        enclosure.heater_relay(),
        FanController::new(enclosure.fan_relay()),
        RuntimeAccumulator::new(store.clone(), now),
        now,
    );

    let mut supervisor = Supervisor::new(
        sensors,
        thermostat,
        store,
        cfg.expected_probes,
        cfg.humidity_alert_floor,
    );

    // The cooldown sequence runs whether the loop ended by interrupt or by
    // fault; only then does the fault decide the exit code.
    let outcome = supervisor.run().await;
    supervisor.shutdown_and_cooldown().await;

    Ok(outcome?)
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// Configures [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `GARLICBOX_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `GARLICBOX_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked. It installs the subscriber globally
/// for the lifetime of the process.
fn init_tracing() {
    // ---
    let span_events = match env::var("GARLICBOX_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to GARLICBOX_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("GARLICBOX_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
