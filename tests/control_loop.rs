use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;

use garlicbox::error::HardwareError;
use garlicbox::fans::FanController;
use garlicbox::hardware::RelayOutput;
use garlicbox::models::{ProbeReading, RelayState, Thresholds};
use garlicbox::runtime::RuntimeAccumulator;
use garlicbox::store::Store;
use garlicbox::thermostat::ThermostatController;

// ---

/// Relay double whose level stays observable after the controller takes
/// ownership of a clone.
#[derive(Clone)]
struct SharedRelay(Arc<Mutex<RelayState>>);

impl SharedRelay {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(RelayState::Off)))
    }

    fn level(&self) -> RelayState {
        *self.0.lock().unwrap()
    }
}

impl RelayOutput for SharedRelay {
    fn set(&mut self, level: RelayState) -> Result<(), HardwareError> {
        *self.0.lock().unwrap() = level;
        Ok(())
    }

    fn get(&self) -> Result<RelayState, HardwareError> {
        Ok(*self.0.lock().unwrap())
    }
}

async fn memory_store() -> Result<Store> {
    // ---
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    garlicbox::schema::create_schema(&pool).await?;
    Ok(Store::new(pool))
}

fn probes(temps: &[f64], now: DateTime<Utc>) -> Vec<ProbeReading> {
    // ---
    temps
        .iter()
        .enumerate()
        .map(|(i, t)| ProbeReading::new(format!("probe_{}", i + 1), *t, now))
        .collect()
}

struct Rig {
    heater: SharedRelay,
    fans: SharedRelay,
    store: Store,
    thermostat: ThermostatController<SharedRelay, SharedRelay>,
}

async fn rig(t0: DateTime<Utc>) -> Result<Rig> {
    // ---
    let store = memory_store().await?;
    let heater = SharedRelay::new();
    let fans = SharedRelay::new();
    let thermostat = ThermostatController::new(
        Thresholds::new(67.5, 72.5)?,
        heater.clone(),
        FanController::new(fans.clone()),
        RuntimeAccumulator::new(store.clone(), t0),
        t0,
    );
    Ok(Rig {
        heater,
        fans,
        store,
        thermostat,
    })
}

// ---

#[tokio::test]
async fn heater_cycle_drives_relays_and_runtime_accounting() -> Result<()> {
    // ---
    let t0 = Utc::now();
    let mut rig = rig(t0).await?;

    // Cold box: lo = 65.0 <= 67.5, heater and fans come on.
    rig.thermostat.tick(&probes(&[65.0, 70.0], t0), t0).await?;
    assert_eq!(rig.heater.level(), RelayState::On);
    assert_eq!(rig.fans.level(), RelayState::On);

    // Inside the band: nothing moves.
    let t1 = t0 + Duration::seconds(60);
    rig.thermostat.tick(&probes(&[68.0, 71.0], t1), t1).await?;
    assert_eq!(rig.heater.level(), RelayState::On);

    // Hot probe reaches the ceiling: heater off. This is the first session
    // the store has ever seen, so it is startup heat-up: not added to the
    // total, sentinel 1 persisted instead.
    let t2 = t0 + Duration::seconds(600);
    rig.thermostat.tick(&probes(&[68.0, 73.0], t2), t2).await?;
    assert_eq!(rig.heater.level(), RelayState::Off);
    assert_eq!(rig.store.heater_seconds().await?, 1);

    // Fans ride out the grace period, then drop.
    let t3 = t2 + Duration::seconds(45);
    rig.thermostat.tick(&probes(&[69.0, 71.0], t3), t3).await?;
    assert_eq!(rig.fans.level(), RelayState::On);

    let t4 = t2 + Duration::seconds(60);
    rig.thermostat.tick(&probes(&[69.0, 71.0], t4), t4).await?;
    assert_eq!(rig.fans.level(), RelayState::Off);

    // Second full cycle: 300 seconds of heating lands in the total.
    let t5 = t2 + Duration::seconds(900);
    rig.thermostat.tick(&probes(&[67.0, 68.0], t5), t5).await?;
    assert_eq!(rig.heater.level(), RelayState::On);

    let t6 = t5 + Duration::seconds(300);
    rig.thermostat.tick(&probes(&[71.0, 72.5], t6), t6).await?;
    assert_eq!(rig.heater.level(), RelayState::Off);
    assert_eq!(rig.store.heater_seconds().await?, 301);

    Ok(())
}

#[tokio::test]
async fn divergence_forces_heater_off_and_fans_on() -> Result<()> {
    // ---
    let t0 = Utc::now();
    let mut rig = rig(t0).await?;

    // From the off state.
    rig.thermostat.tick(&probes(&[60.0, 80.0], t0), t0).await?;
    assert_eq!(rig.heater.level(), RelayState::Off);
    assert_eq!(rig.fans.level(), RelayState::On);

    // From the on state: heat first, then feed straddling readings.
    let t1 = t0 + Duration::seconds(120);
    rig.thermostat.tick(&probes(&[65.0, 66.0], t1), t1).await?;
    assert_eq!(rig.heater.level(), RelayState::On);

    let t2 = t1 + Duration::seconds(120);
    rig.thermostat.tick(&probes(&[60.0, 80.0], t2), t2).await?;
    assert_eq!(rig.heater.level(), RelayState::Off);
    assert_eq!(rig.fans.level(), RelayState::On);

    Ok(())
}

#[tokio::test]
async fn shutdown_records_final_session_and_reports_cooldown() -> Result<()> {
    // ---
    let t0 = Utc::now();
    let mut rig = rig(t0).await?;

    // Heater idle: no cooldown owed.
    assert!(!rig.thermostat.shutdown(t0).await?);

    // Get past the startup-exclusion session first.
    rig.thermostat.tick(&probes(&[65.0, 66.0], t0), t0).await?;
    let t1 = t0 + Duration::seconds(100);
    rig.thermostat.tick(&probes(&[72.5, 72.6], t1), t1).await?;
    assert_eq!(rig.store.heater_seconds().await?, 1);

    // Heat again, then shut down mid-session: the duration is recorded
    // exactly as a normal off transition would record it.
    let t2 = t1 + Duration::seconds(100);
    rig.thermostat.tick(&probes(&[65.0, 66.0], t2), t2).await?;
    assert_eq!(rig.heater.level(), RelayState::On);

    let t3 = t2 + Duration::seconds(200);
    assert!(rig.thermostat.shutdown(t3).await?);
    assert_eq!(rig.heater.level(), RelayState::Off);
    assert_eq!(rig.fans.level(), RelayState::On);
    assert_eq!(rig.store.heater_seconds().await?, 201);

    rig.thermostat.release()?;
    assert_eq!(rig.fans.level(), RelayState::Off);

    Ok(())
}

#[tokio::test]
async fn duty_cycle_reports_percentage_of_runtime() -> Result<()> {
    // ---
    let store = memory_store().await?;
    store.set_heater_seconds(3900).await?;

    let now = Utc::now();
    let baseline = now - Duration::seconds(10_000);
    let mut accumulator = RuntimeAccumulator::new(store.clone(), baseline);

    let report = accumulator
        .record_duration(Duration::seconds(12), now)
        .await?
        .expect("initialized counter must produce a report");

    assert_eq!(report.total_on_secs, 3912);
    assert_eq!(report.runtime_secs, 10_000);
    assert!((report.percentage - 39.12).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
async fn cumulative_total_round_trips_and_never_decreases() -> Result<()> {
    // ---
    let store = memory_store().await?;

    store.set_heater_seconds(3912).await?;
    assert_eq!(store.heater_seconds().await?, 3912);

    let now = Utc::now();
    let mut accumulator = RuntimeAccumulator::new(store.clone(), now - Duration::seconds(100));

    let mut previous = store.heater_seconds().await?;
    for session_secs in [15, 0, 90, 1] {
        accumulator
            .record_duration(Duration::seconds(session_secs), now)
            .await?;
        let total = store.heater_seconds().await?;
        assert!(total >= previous, "total went backwards: {previous} -> {total}");
        previous = total;
    }
    assert_eq!(previous, 3912 + 15 + 90 + 1);

    Ok(())
}

#[tokio::test]
async fn first_session_after_fresh_install_is_excluded() -> Result<()> {
    // ---
    let store = memory_store().await?;
    assert_eq!(store.heater_seconds().await?, 0);

    let now = Utc::now();
    let mut accumulator = RuntimeAccumulator::new(store.clone(), now - Duration::seconds(3600));

    let report = accumulator
        .record_duration(Duration::seconds(3912), now)
        .await?;
    assert!(report.is_none(), "startup session must not produce a report");
    assert_eq!(accumulator.read_total().await?, 1);

    // Maintenance reset takes the counter back to "never run".
    store.clear_runtime().await?;
    assert_eq!(store.heater_seconds().await?, 0);

    Ok(())
}

#[tokio::test]
async fn query_passthrough_caps_results_at_thirty_rows() -> Result<()> {
    // ---
    let store = memory_store().await?;
    let now = Utc::now();

    let readings = probes(&vec![70.0; 40], now);
    store.write_temperatures(&readings).await?;

    let rows = store
        .execute_query("SELECT probe_id, temperature FROM probe_temperature")
        .await?;
    assert_eq!(rows.len(), 30);
    assert!(rows[0].contains("70"));

    // Broken SQL surfaces as an error string, not a panic.
    assert!(store.execute_query("SELEC nonsense").await.is_err());

    Ok(())
}
