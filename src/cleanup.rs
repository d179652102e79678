//! Background sweep of expired challenges, sessions and rate-limit windows.
//!
//! Expiry is enforced at lookup time, so this job only reclaims memory.
//! It matters for the in-memory store; Redis expires keys on its own.

use crate::clock::Clock;
use crate::storage::{StoreError, Stores};
use std::sync::Arc;
use std::time::Duration;

/// Run the sweep loop.
///
/// Purges expired entries every `interval`. Never returns.
pub async fn run_sweep_loop(stores: Stores, clock: Arc<dyn Clock>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;

        if let Err(e) = sweep_expired(&stores, clock.as_ref()).await {
            tracing::error!(error = %e, "Sweep job failed");
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub challenges: usize,
    pub sessions: usize,
    pub rate_windows: usize,
}

/// Purge everything that expired before the clock's current time.
pub async fn sweep_expired(stores: &Stores, clock: &dyn Clock) -> Result<SweepReport, StoreError> {
    let now = clock.now();

    let report = SweepReport {
        challenges: stores.challenges.purge_expired(now).await?,
        sessions: stores.sessions.purge_expired(now).await?,
        rate_windows: stores.rate_limits.purge_expired(now).await?,
    };

    if report != SweepReport::default() {
        tracing::info!(
            challenges = report.challenges,
            sessions = report.sessions,
            rate_windows = report.rate_windows,
            "Sweep job completed"
        );
    }

    Ok(report)
}
