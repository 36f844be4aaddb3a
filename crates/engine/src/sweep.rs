//! Overdue & reminder sweep timer (PRD-06).
//!
//! A fixed-interval loop, deliberately independent of any user-facing
//! refresh cadence, that submits `SweepTick` commands to the chore service.
//! The pass itself runs inside the service task so it can never race a
//! claim or reset on the same record.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::service::ChoreHandle;

/// Run the sweep loop until `cancel` fires.
pub async fn run(handle: ChoreHandle, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Overdue/reminder sweep started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Overdue/reminder sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                if handle.sweep_tick().await.is_err() {
                    tracing::warn!("Chore service gone, sweep loop exiting");
                    break;
                }
            }
        }
    }
}
