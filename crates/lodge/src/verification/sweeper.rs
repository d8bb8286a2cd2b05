//! Background eviction of expired codes.
//!
//! Abandoned codes are never validated, so without the sweep they would sit
//! in memory until the process exits.

use lodge_common::{LodgeError, SharedClock};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::{VerificationStats, VerificationStore};

/// Sweep the store once against the current time
pub fn run_sweep(
    store: &VerificationStore,
    clock: &SharedClock,
    stats: &VerificationStats,
) -> Result<usize, LodgeError> {
    let removed = store.sweep_expired(clock.now())?;

    if removed > 0 {
        stats.swept.fetch_add(removed as u64, Ordering::Relaxed);
        tracing::debug!(removed = removed, "Swept expired verification codes");
    }

    Ok(removed)
}

/// Background worker that sweeps the store on a fixed interval until shutdown
pub async fn sweeper_worker(
    store: Arc<VerificationStore>,
    clock: SharedClock,
    stats: Arc<VerificationStats>,
    interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "🧹 Sweeper started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_sweep(&store, &clock, &stats) {
                    tracing::error!(error = %e, "Sweep failed");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("🧹 Sweeper shutting down...");
                break;
            }
        }
    }
}
