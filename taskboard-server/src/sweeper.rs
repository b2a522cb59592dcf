//! Background consistency sweep.

use std::sync::Arc;
use std::time::Duration;

use taskboard::EntityStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::server::AppState;

/// Runs the consistency sweep every `every` until `shutdown` flips to `true`.
///
/// The first sweep runs one full interval after startup. A failed sweep is
/// logged and retried on the next tick.
pub fn spawn_periodic_sweep<S: EntityStore + 'static>(
    state: Arc<AppState<S>>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = every.as_secs(), "periodic consistency sweep enabled");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = state.board.run_consistency_sweep().await {
                        tracing::warn!(error = %e, "consistency sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("periodic consistency sweep stopped");
    })
}
