//! Periodic sync scheduling.

use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;

use crate::config::SyncConfig;
use crate::sync::engine::{RunOutcome, SyncEngine};

/// First retry delay after a reschedulable run. Doubles up to the interval.
const RETRY_BASE: Duration = Duration::from_secs(30);

/// Control over future sync runs.
pub trait Scheduler: Send + Sync {
    /// Stop all future runs until re-armed.
    fn cancel_all(&self);

    fn is_cancelled(&self) -> bool;
}

/// Runs the engine once per interval, plus a random delay of up to
/// `jitter`, until cancelled.
#[derive(Debug)]
pub struct PeriodicScheduler {
    interval: Duration,
    jitter: Duration,
    cancelled: watch::Sender<bool>,
}

impl PeriodicScheduler {
    pub fn new(interval: Duration, jitter: Duration) -> Self {
        let (cancelled, _) = watch::channel(false);
        Self {
            interval,
            jitter,
            cancelled,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            Duration::from_secs(config.interval_secs),
            Duration::from_secs(config.jitter_secs),
        )
    }

    /// Allow runs again after a cancel, e.g. after logging back in.
    pub fn rearm(&self) {
        self.cancelled.send_replace(false);
        tracing::debug!("Sync schedule re-armed");
    }

    fn period_delay(&self) -> Duration {
        let jitter = self.jitter.as_secs();
        let extra = if jitter == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter)
        };
        self.interval.saturating_add(Duration::from_secs(extra))
    }

    /// Run `engine` on schedule until cancelled. Returns the number of runs.
    pub async fn run(&self, engine: &SyncEngine) -> usize {
        self.run_with(engine, |_| {}).await
    }

    /// Like [`PeriodicScheduler::run`], handing each outcome to `on_outcome`.
    pub async fn run_with<F>(&self, engine: &SyncEngine, mut on_outcome: F) -> usize
    where
        F: FnMut(&RunOutcome),
    {
        let mut cancelled = self.cancelled.subscribe();
        let mut retry = RETRY_BASE;
        let mut runs = 0;

        while !*cancelled.borrow_and_update() {
            let outcome = engine.run_once().await;
            runs += 1;
            on_outcome(&outcome);

            if self.is_cancelled() {
                break;
            }

            let delay = if outcome.reschedule {
                let delay = retry.min(self.interval);
                retry = retry.saturating_mul(2).min(self.interval);
                delay
            } else {
                retry = RETRY_BASE;
                self.period_delay()
            };
            tracing::debug!("Next sync in {}s", delay.as_secs());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancelled.wait_for(|c| *c) => break,
            }
        }

        tracing::info!("Sync schedule stopped after {} run(s)", runs);
        runs
    }
}

impl Scheduler for PeriodicScheduler {
    fn cancel_all(&self) {
        self.cancelled.send_replace(true);
        tracing::info!("Cancelled scheduled syncs");
    }

    fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }
}
