//! Expiration Sweeper
//!
//! Periodic task that releases reservations past their TTL. Any interval
//! materially shorter than the reservation TTL is acceptable; a failed
//! sweep is logged and simply retried on the next tick.

use super::engine::ReservationEngine;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default sweep interval: hourly.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Run the sweep loop until `shutdown` fires.
pub async fn run(engine: ReservationEngine, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately; skip it so startup stays quiet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("reservation sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                match engine.cleanup_expired().await {
                    Ok(outcome) if outcome.total_released > 0 => {
                        tracing::info!(
                            products = outcome.products_updated,
                            released = outcome.total_released,
                            "released expired stock reservations"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "reservation sweep failed, retrying next interval");
                    }
                }
            }
        }
    }
}
