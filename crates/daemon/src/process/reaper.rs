use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::files::AccessController;

/// Sweep expired files every `period` until shutdown.
pub async fn run(access: AccessController, period: Duration, mut shutdown_rx: watch::Receiver<()>) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer.tick().await; // Skip first immediate tick

    tracing::info!(period_secs = period.as_secs(), "expiry reaper started");

    loop {
        tokio::select! {
            _ = timer.tick() => {
                match access.reap_expired().await {
                    Ok(0) => tracing::debug!("no expired files"),
                    Ok(removed) => tracing::info!(removed, "reaped expired files"),
                    Err(e) => tracing::error!(error = %e, "expiry sweep failed"),
                }
            }
            _ = shutdown_rx.changed() => {
                tracing::info!("expiry reaper shutting down");
                break;
            }
        }
    }
}
