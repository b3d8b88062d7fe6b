// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Background loop that keeps tracked topics in sync.
//!
//! Two schedules run side by side:
//!
//! - every `check_interval` the stale topics are resynced
//! - every `backstop_interval` all non-inactive topics are resynced,
//!   stale or not, to catch desynchronisation the silence check cannot see
//!
//! A failed or timed-out resync is logged and left for the next tick; it
//! never ends the loop.

use crate::source::Resync;
use crate::tracker::StalenessTracker;
use core::fmt;
use core::time::Duration;
use futures::future::{select, Either};
use mesa_core::{CancellationToken, MesaError, MesaTask, Result};
use mesa_runtime::{DefaultTimer, Timer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    #[serde(rename = "check_interval_ms", with = "mesa_core::duration_ms")]
    pub check_interval: Duration,
    #[serde(rename = "backstop_interval_ms", with = "mesa_core::duration_ms")]
    pub backstop_interval: Duration,
    /// Upper bound on a single topic's resync.
    #[serde(rename = "resync_timeout_ms", with = "mesa_core::duration_ms")]
    pub resync_timeout: Duration,
}

impl WatchdogConfig {
    #[must_use]
    pub const fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_backstop_interval(mut self, interval: Duration) -> Self {
        self.backstop_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_resync_timeout(mut self, timeout: Duration) -> Self {
        self.resync_timeout = timeout;
        self
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            backstop_interval: Duration::from_secs(5 * 60),
            resync_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of one resync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub resynced: Vec<String>,
    pub failed: Vec<String>,
}

impl CheckReport {
    pub fn is_empty(&self) -> bool {
        self.resynced.is_empty() && self.failed.is_empty()
    }
}

struct Shared<R, TM: Timer> {
    tracker: StalenessTracker<TM>,
    resync: R,
    config: WatchdogConfig,
}

impl<R: Resync, TM: Timer> Shared<R, TM> {
    async fn check(&self) -> CheckReport {
        self.run(self.tracker.stale_topics()).await
    }

    async fn backstop(&self) -> CheckReport {
        // Pick up newly stale topics first so a failure keeps them retried
        self.tracker.stale_topics();
        self.run(self.tracker.active_topics()).await
    }

    async fn run(&self, topics: Vec<String>) -> CheckReport {
        let mut report = CheckReport::default();
        for topic in topics {
            match self.resync_one(&topic).await {
                Ok(()) => {
                    if let Err(err) = self.tracker.mark_synced(&topic) {
                        debug!("resynced topic vanished: {err}");
                    }
                    report.resynced.push(topic);
                }
                Err(err) => {
                    warn!("resync of {topic} failed, retrying next tick: {err}");
                    report.failed.push(topic);
                }
            }
        }
        report
    }

    async fn resync_one(&self, topic: &str) -> Result<()> {
        let limit = self.config.resync_timeout;
        let deadline = Box::pin(self.tracker.timer().sleep_future(limit));
        match select(self.resync.resync(topic), deadline).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => Err(MesaError::timeout(format!("resync of {topic}"), limit)),
        }
    }
}

/// Periodic resync driver for one [`StalenessTracker`].
///
/// The loop runs on the Tokio runtime until [`stop`](Self::stop) is called
/// or the watchdog is dropped.
pub struct Watchdog<R, TM: Timer = DefaultTimer> {
    shared: Arc<Shared<R, TM>>,
    task: MesaTask,
}

impl<R: Resync, TM: Timer> Watchdog<R, TM> {
    /// Start the loop on the current Tokio runtime.
    ///
    /// # Errors
    /// `MesaError::NoRuntime` when called outside a Tokio runtime.
    pub fn spawn(tracker: StalenessTracker<TM>, resync: R, config: WatchdogConfig) -> Result<Self> {
        let start = tracker.timer().now();
        let shared = Arc::new(Shared {
            tracker,
            resync,
            config,
        });
        let looped = Arc::clone(&shared);
        let task = MesaTask::spawn(move |cancel| run_loop(looped, config, start, cancel))?;
        info!(
            "watchdog started: check every {:?}, backstop every {:?}",
            config.check_interval, config.backstop_interval
        );
        Ok(Self { shared, task })
    }

    /// Run one stale check now, outside the schedule.
    pub async fn check_now(&self) -> CheckReport {
        self.shared.check().await
    }

    /// Resync every non-inactive topic now.
    pub async fn resync_all(&self) -> CheckReport {
        self.shared.backstop().await
    }

    pub fn stop(&self) {
        self.task.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_cancelled()
    }

    pub fn tracker(&self) -> &StalenessTracker<TM> {
        &self.shared.tracker
    }

    pub fn resync(&self) -> &R {
        &self.shared.resync
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.shared.config
    }
}

async fn run_loop<R: Resync, TM: Timer>(
    shared: Arc<Shared<R, TM>>,
    config: WatchdogConfig,
    start: TM::Instant,
    cancel: CancellationToken,
) {
    // Schedules count from spawn time, not from the task's first poll
    let timer = shared.tracker.timer().clone();
    let mut next_check = start + config.check_interval;
    let mut next_backstop = start + config.backstop_interval;

    while !cancel.is_cancelled() {
        let wake = next_check.min(next_backstop);
        let now = timer.now();
        let wait = if wake > now { wake - now } else { Duration::ZERO };

        let sleep = Box::pin(timer.sleep_future(wait));
        if let Either::Right(_) = select(sleep, Box::pin(cancel.cancelled())).await {
            break;
        }

        let now = timer.now();
        let pass = if now >= next_backstop {
            next_backstop = now + config.backstop_interval;
            next_check = now + config.check_interval;
            Either::Left(shared.backstop())
        } else {
            next_check = now + config.check_interval;
            Either::Right(shared.check())
        };

        let pass = Box::pin(pass);
        match select(pass, Box::pin(cancel.cancelled())).await {
            Either::Left((report, _)) => {
                if !report.is_empty() {
                    debug!(
                        "resync pass: {} ok, {} failed",
                        report.resynced.len(),
                        report.failed.len()
                    );
                }
            }
            Either::Right(_) => break,
        }
    }
    debug!("watchdog stopped");
}

impl<R, TM: Timer> fmt::Debug for Watchdog<R, TM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchdog")
            .field("config", &self.shared.config)
            .field("running", &!self.task.is_cancelled())
            .finish()
    }
}
