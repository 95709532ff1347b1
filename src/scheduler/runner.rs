//! Recurring update-check timer.
//!
//! Spawns a tokio task that runs a scheduled check immediately and then on a
//! fixed interval until [`Scheduler::stop`] cancels it.

use crate::update::{TriggerKind, UpdateCoordinator};
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct RunningSchedule {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    interval: Duration,
}

/// Drives `check_for_updates(Scheduled)` on a fixed interval.
///
/// Holds only a weak reference to the coordinator; the loop ends on its own
/// if the coordinator is dropped.
#[derive(Default)]
pub struct Scheduler {
    running: Mutex<Option<RunningSchedule>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start checking now and every `interval` afterwards.
    ///
    /// Calling `start` again replaces the previous schedule. Must be called
    /// from within a tokio runtime.
    pub fn start(&self, interval: Duration, target: Weak<UpdateCoordinator>) {
        let interval = interval.max(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => {
                        debug!("update schedule cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(coordinator) = target.upgrade() else {
                            debug!("update coordinator dropped; ending schedule");
                            break;
                        };
                        let outcome = coordinator.check_for_updates(TriggerKind::Scheduled).await;
                        debug!(?outcome, "scheduled update check finished");
                    }
                }
            }
        });

        let previous = self.lock().replace(RunningSchedule {
            cancel,
            handle,
            interval,
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
            debug!("replaced previous update schedule");
        }
        info!(interval_ms = interval.as_millis() as u64, "periodic update checks started");
    }

    /// Cancel the pending recurrence.
    ///
    /// Idempotent and safe before [`start`](Self::start). A check already in
    /// flight runs to completion. Returns `true` if a schedule was cancelled.
    pub fn stop(&self) -> bool {
        match self.lock().take() {
            Some(schedule) => {
                schedule.cancel.cancel();
                drop(schedule.handle);
                info!("periodic update checks stopped");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|schedule| !schedule.handle.is_finished())
    }

    /// Interval of the active schedule.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.lock().as_ref().map(|schedule| schedule.interval)
    }

    fn lock(&self) -> MutexGuard<'_, Option<RunningSchedule>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(schedule) = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            schedule.cancel.cancel();
        }
    }
}
