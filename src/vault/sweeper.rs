//! Periodic eviction of expired secrets.

use super::SharedVault;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Background task that removes expired records on a fixed interval.
#[derive(Debug)]
pub struct ExpirySweeper {
    vault: SharedVault,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(vault: SharedVault, interval: Duration) -> Self {
        Self { vault, interval }
    }

    /// Start sweeping. The first pass runs one interval after spawning.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        SweeperHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = period.as_secs_f64(), "Expiry sweeper started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    // A panicking pass must not take the sweeper down with it.
                    let vault = self.vault.clone();
                    match tokio::spawn(async move { vault.sweep_expired().await }).await {
                        Ok(removed) => debug!(removed, "Sweep pass complete"),
                        Err(e) => error!(error = %e, "Sweep pass failed"),
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    }
}

/// Owner of a running sweeper. Dropping it also stops the sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper and wait for it to exit.
    ///
    /// A pass already in progress finishes first; each removal is atomic, so
    /// there is no partial state to undo.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Expiry sweeper task ended abnormally");
        }
    }
}
