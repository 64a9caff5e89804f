//! Background garbage collection for one-off identities.
//!
//! Lazy expiry on access keeps verification correct; this task only bounds
//! memory by periodically dropping expired records and elapsed windows.

use std::sync::Arc;
use std::time::Duration;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

use super::service::OtpService;

/// Spawn the sweeper loop. A zero interval is clamped to one second.
pub fn spawn_sweeper(service: Arc<OtpService>, interval: Duration) -> JoinHandle<()> {
    let interval = if interval.is_zero() {
        Duration::from_secs(1)
    } else {
        interval
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let (records, windows) = service.sweep();
            if records > 0 || windows > 0 {
                debug!(records, windows, "otp sweep removed stale state");
            }
        }
    })
}
