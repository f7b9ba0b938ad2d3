//! Cumulative heater runtime accounting.
//!
//! Persists how long the heater has been on across process restarts and
//! reports a duty-cycle percentage per completed heating session. The very
//! first session after the counter is created is the startup heat-up from
//! ambient and would skew the duty cycle, so it is excluded: the persisted
//! counter moves from 0 ("never run") to a sentinel 1 ("initialized") and
//! the duty-cycle baseline resets to that moment.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::StoreError;
use crate::models::DutyCycle;
use crate::store::Store;

// ---

pub struct RuntimeAccumulator {
    store: Store,
    /// Duty-cycle baseline. Process-local, never persisted; reset on the
    /// first recorded session after the counter is created.
    baseline: DateTime<Utc>,
}

impl RuntimeAccumulator {
    pub fn new(store: Store, now: DateTime<Utc>) -> Self {
        Self {
            store,
            baseline: now,
        }
    }

    /// Record one completed heating session.
    ///
    /// Returns `None` for the startup session (excluded from the total),
    /// otherwise the updated duty-cycle report. The new total commits
    /// atomically; on a crash the prior value stays readable.
    pub async fn record_duration(
        &mut self,
        on_for: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<DutyCycle>, StoreError> {
        // ---
        let total = self.store.heater_seconds().await?;

        if total == 0 {
            info!(
                "Finished startup heating in {}.",
                format_hms(on_for.num_seconds())
            );
            self.baseline = now;
            self.store.set_heater_seconds(1).await?;
            return Ok(None);
        }

        let new_total = total + on_for.num_seconds();
        self.store.set_heater_seconds(new_total).await?;

        let runtime_secs = (now - self.baseline).num_seconds().max(1);
        let percentage = new_total as f64 / runtime_secs as f64 * 100.0;
        info!("Cumulative heating: {new_total}s over {runtime_secs}s, {percentage:.1}%.");

        Ok(Some(DutyCycle {
            total_on_secs: new_total,
            runtime_secs,
            percentage,
        }))
    }

    /// Persisted cumulative total, without mutation.
    pub async fn read_total(&self) -> Result<i64, StoreError> {
        self.store.heater_seconds().await
    }
}

/// Render a second count as e.g. `1h 5m 12s`, omitting zero components.
fn format_hms(total_seconds: i64) -> String {
    // ---
    let parts = [
        (total_seconds / 3600, "h"),
        ((total_seconds / 60) % 60, "m"),
        (total_seconds % 60, "s"),
    ];
    let text: Vec<String> = parts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, suffix)| format!("{n}{suffix}"))
        .collect();
    if text.is_empty() {
        "0s".to_string()
    } else {
        text.join(" ")
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn format_hms_drops_zero_components() {
        // ---
        assert_eq!(format_hms(3912), "1h 5m 12s");
        assert_eq!(format_hms(65), "1m 5s");
        assert_eq!(format_hms(3600), "1h");
        assert_eq!(format_hms(0), "0s");
    }
}
