// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic telemetry polling.
//!
//! The [`PollScheduler`] is the only component deciding when the device is
//! polled for monitoring. It runs one cycle per tick on a fixed cadence and
//! never overlaps cycles: a tick that falls due while a cycle is still
//! running is skipped, not queued.
//!
//! [`PollControl`] is the handle shared with everything else: it pauses
//! polling (for instance while an operator command is in flight), requests an
//! immediate refresh, and stops the scheduler.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// One monitoring round, run by the scheduler on each tick.
pub trait PollCycle: Send + Sync + 'static {
    /// Runs a full round. Failures are absorbed by the implementation.
    fn poll_cycle(&self) -> impl Future<Output = ()> + Send;
}

/// Pause, refresh and stop signals for a [`PollScheduler`].
#[derive(Debug)]
pub struct PollControl {
    pauses: AtomicUsize,
    refresh: Notify,
    stop: watch::Sender<bool>,
}

impl PollControl {
    /// Creates a running, unpaused control.
    #[must_use]
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            pauses: AtomicUsize::new(0),
            refresh: Notify::new(),
            stop,
        }
    }

    /// Pauses polling until the returned guard is dropped.
    ///
    /// Pauses nest: polling resumes when the last guard is dropped.
    #[must_use = "polling resumes as soon as the guard is dropped"]
    pub fn pause(self: &Arc<Self>) -> PauseGuard {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        PauseGuard {
            control: Arc::clone(self),
        }
    }

    /// Returns `true` while at least one pause guard is alive.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pauses.load(Ordering::SeqCst) > 0
    }

    /// Asks the scheduler for an extra cycle as soon as it is idle.
    ///
    /// Requests made while a cycle is running collapse into one.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Signals the scheduler to stop after its current cycle.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Returns `true` once [`stop`](Self::stop) was called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Clears a previous stop so a new scheduler can run on this control.
    pub(crate) fn rearm(&self) {
        self.stop.send_replace(false);
    }
}

impl Default for PollControl {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII pause of a [`PollControl`].
#[derive(Debug)]
pub struct PauseGuard {
    control: Arc<PollControl>,
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        self.control.pauses.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A spawned polling task.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use luxos_sync::scheduler::{PollControl, PollCycle, PollScheduler};
///
/// struct Heartbeat;
///
/// impl PollCycle for Heartbeat {
///     async fn poll_cycle(&self) {
///         println!("tick");
///     }
/// }
///
/// # async fn example() {
/// let control = Arc::new(PollControl::new());
/// let scheduler = PollScheduler::spawn(
///     Arc::new(Heartbeat),
///     Duration::from_secs(10),
///     Arc::clone(&control),
/// );
/// scheduler.stop().await;
/// # }
/// ```
#[derive(Debug)]
pub struct PollScheduler {
    control: Arc<PollControl>,
    handle: JoinHandle<()>,
}

impl PollScheduler {
    /// Spawns a scheduler running `cycle` every `period`, first tick now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C: PollCycle>(cycle: Arc<C>, period: Duration, control: Arc<PollControl>) -> Self {
        let handle = tokio::spawn(run(cycle, period, Arc::clone(&control)));
        Self { control, handle }
    }

    /// Returns the shared control handle.
    #[must_use]
    pub fn control(&self) -> &Arc<PollControl> {
        &self.control
    }

    /// Returns `true` if the polling task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops scheduling and waits for the in-flight cycle, if any.
    pub async fn stop(self) {
        self.control.stop();
        if let Err(err) = self.handle.await {
            tracing::error!(error = %err, "Poll scheduler task failed");
        }
    }
}

async fn run<C: PollCycle>(cycle: Arc<C>, period: Duration, control: Arc<PollControl>) {
    let mut stop = control.stop.subscribe();
    let mut next_tick = Instant::now();

    tracing::debug!(period_ms = period.as_millis(), "Poll scheduler started");

    loop {
        let ticked = tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => break,
            () = tokio::time::sleep_until(next_tick) => true,
            () = control.refresh.notified() => false,
        };

        if ticked {
            next_tick += period;
        }

        if control.is_paused() {
            tracing::trace!("Polling paused, skipping cycle");
            continue;
        }

        cycle.poll_cycle().await;

        let now = Instant::now();
        while next_tick < now {
            tracing::trace!("Tick fell due during a running cycle, skipping");
            next_tick += period;
        }
    }

    tracing::debug!("Poll scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        duration: Duration,
        started: AtomicUsize,
        finished: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl Probe {
        fn taking(duration: Duration) -> Arc<Self> {
            Arc::new(Self {
                duration,
                ..Self::default()
            })
        }

        fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }
    }

    impl PollCycle for Probe {
        async fn poll_cycle(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.duration).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn spawn(probe: &Arc<Probe>, period: Duration) -> PollScheduler {
        PollScheduler::spawn(Arc::clone(probe), period, Arc::new(PollControl::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_a_fixed_cadence() {
        let probe = Probe::taking(Duration::from_secs(1));
        let scheduler = spawn(&probe, Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(probe.started(), 4);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycles_skip_ticks_instead_of_queueing() {
        let probe = Probe::taking(Duration::from_secs(25));
        let scheduler = spawn(&probe, Duration::from_secs(10));

        // Cycles start at 0 s and 30 s; ticks at 10, 20, 40 and 50 s are skipped.
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(probe.started(), 2);
        assert_eq!(probe.max_running.load(Ordering::SeqCst), 1);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn paused_ticks_are_skipped_and_refresh_polls_immediately() {
        let probe = Probe::taking(Duration::from_millis(10));
        let scheduler = spawn(&probe, Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(probe.started(), 1);

        let guard = scheduler.control().pause();
        let nested = scheduler.control().pause();
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(probe.started(), 1);

        drop(guard);
        assert!(scheduler.control().is_paused());
        drop(nested);
        assert!(!scheduler.control().is_paused());

        scheduler.control().request_refresh();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(probe.started(), 2);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_the_running_cycle_finish() {
        let probe = Probe::taking(Duration::from_secs(5));
        let scheduler = spawn(&probe, Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let before = Instant::now();
        scheduler.stop().await;
        assert!(before.elapsed() >= Duration::from_secs(4));
        assert_eq!(probe.started(), 1);
        assert_eq!(probe.finished.load(Ordering::SeqCst), 1);
    }
}
