//! Cycle reset orchestrator timer (PRD-07).
//!
//! Fires a `ResetTick` once at startup (catch-up for rollovers missed while
//! the process was down) and then at every local-midnight boundary. The
//! sleep is re-armed each iteration and cancelled cleanly on shutdown; the
//! reset pass itself runs inside the service task.

use chrono::{DateTime, Days, NaiveTime, Utc};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use chorewheel_core::recurrence::resolve_local;

use crate::service::ChoreHandle;

/// Run the reset loop until `cancel` fires.
pub async fn run(handle: ChoreHandle, tz: Tz, cancel: CancellationToken) {
    tracing::info!(%tz, "Cycle reset orchestrator started");

    // Startup catch-up pass.
    if handle.reset_tick().await.is_err() {
        tracing::warn!("Chore service gone, reset loop exiting");
        return;
    }

    loop {
        let wait = until_next_midnight(Utc::now(), tz);
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Cycle reset orchestrator stopping");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                if handle.reset_tick().await.is_err() {
                    tracing::warn!("Chore service gone, reset loop exiting");
                    break;
                }
            }
        }
    }
}

/// Time remaining until the next local midnight in `tz`.
///
/// A zone where midnight falls into a DST gap resolves to the first valid
/// instant after it.
fn until_next_midnight(now: DateTime<Utc>, tz: Tz) -> std::time::Duration {
    let local_date = now.with_timezone(&tz).date_naive();
    let tomorrow = local_date
        .checked_add_days(Days::new(1))
        .expect("date within supported range");
    let midnight = resolve_local(tomorrow.and_time(NaiveTime::MIN), tz);
    (midnight - now)
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(1))
}
