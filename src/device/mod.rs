// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device synchronizer facade.
//!
//! A [`Miner`] owns everything needed to keep one LuxOS device in sync: the
//! device link, the normalizer, the state cache, the command gateway, the
//! power controller and the event bus. There is no process-wide state, so
//! any number of miners can run side by side.
//!
//! ```no_run
//! use luxos_sync::Miner;
//!
//! # async fn example() -> luxos_sync::Result<()> {
//! let miner = Miner::http("192.168.1.50").build()?;
//! let mut events = miner.subscribe();
//!
//! miner.start();
//! miner.set_target(Some(3000.0))?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "http")]
mod builder;
mod core;

#[cfg(feature = "http")]
pub use builder::MinerBuilder;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use self::core::MinerCore;
use crate::command::ControlCommand;
use crate::config::SyncConfig;
use crate::control::{ControlTarget, ControllerStatus};
use crate::error::{Error, ValueError};
use crate::event::{DeviceId, SyncEvent};
use crate::gateway::Ack;
use crate::protocol::Transport;
use crate::scheduler::PollScheduler;
use crate::state::DeviceSnapshot;

#[cfg(feature = "http")]
use crate::protocol::{HttpConfig, HttpTransport};

/// One synchronized LuxOS miner.
///
/// Dropping the miner stops its scheduler and tears down the state cache.
#[derive(Debug)]
pub struct Miner<T> {
    core: Arc<MinerCore<T>>,
    scheduler: Mutex<Option<PollScheduler>>,
}

#[cfg(feature = "http")]
impl Miner<HttpTransport> {
    /// Starts building a miner reached over HTTP at `host`.
    #[must_use]
    pub fn http(host: impl Into<String>) -> MinerBuilder {
        MinerBuilder::new(HttpConfig::new(host))
    }
}

impl<T: Transport> Miner<T> {
    /// Creates a miner over any transport.
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` if `config` is invalid.
    pub fn new(transport: T, config: SyncConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            core: Arc::new(MinerCore::new(transport, config)),
            scheduler: Mutex::new(None),
        })
    }

    /// Returns the identifier used in logs and events.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.core.id
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.core.config
    }

    // ========== Polling ==========

    /// Runs one poll round now, followed by a controller evaluation.
    ///
    /// # Errors
    ///
    /// - `Error::Transport` if the device could not be reached
    /// - `Error::Normalize` if the responses could not be normalized
    /// - `Error::NotRunning` if the state cache was torn down
    ///
    /// Transport and normalize failures are also recorded in the state cache.
    pub async fn poll_once(&self) -> Result<Arc<DeviceSnapshot>, Error> {
        self.core.poll().await
    }

    /// Spawns the poll scheduler. Does nothing if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut slot = self.scheduler.lock();
        if slot.as_ref().is_some_and(|s| !s.is_finished()) {
            tracing::debug!(device = %self.core.id, "Scheduler already running");
            return;
        }
        self.core.control.rearm();
        *slot = Some(PollScheduler::spawn(
            Arc::clone(&self.core),
            self.core.config.poll_interval(),
            Arc::clone(&self.core.control),
        ));
        tracing::info!(
            device = %self.core.id,
            interval_ms = self.core.config.poll_interval().as_millis(),
            "Synchronizer started"
        );
    }

    /// Stops the scheduler, letting an in-flight round complete.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotRunning` if the scheduler was not started.
    pub async fn stop(&self) -> Result<(), Error> {
        let scheduler = self.scheduler.lock().take().ok_or(Error::NotRunning)?;
        scheduler.stop().await;
        tracing::info!(device = %self.core.id, "Synchronizer stopped");
        Ok(())
    }

    /// Returns `true` while the scheduler is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler
            .lock()
            .as_ref()
            .is_some_and(|s| !s.is_finished())
    }

    // ========== Observation ==========

    /// Returns the latest snapshot, or `None` before the first successful
    /// poll.
    #[must_use]
    pub fn current_snapshot(&self) -> Option<Arc<DeviceSnapshot>> {
        self.core.cache.read()
    }

    /// Returns a receiver notified of every new snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<Arc<DeviceSnapshot>>> {
        self.core.cache.subscribe()
    }

    /// Subscribes to synchronizer events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.core.events.subscribe()
    }

    /// Returns the power controller state.
    #[must_use]
    pub fn controller_status(&self) -> ControllerStatus {
        self.core.controller.lock().status()
    }

    // ========== Power control ==========

    /// Sets the power target in watts using the configured bounds and
    /// tuning, or disables control with `None`.
    ///
    /// Once the device has reported its hash boards, the target must also
    /// lie within the bounds for that board count.
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` if the target is outside the power bounds.
    pub fn set_target(&self, watts: Option<f64>) -> Result<(), Error> {
        let target = watts
            .map(|w| ControlTarget::new(w, self.core.config.control()))
            .transpose()?;
        if let Some(target) = &target {
            self.check_reachable(target)?;
        }
        self.apply_target(target);
        Ok(())
    }

    /// Sets a power target with custom bounds and tuning.
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` if the target is inconsistent or outside the
    /// bounds for the device's board count.
    pub fn set_control_target(&self, target: ControlTarget) -> Result<(), Error> {
        target.validate()?;
        self.check_reachable(&target)?;
        self.apply_target(Some(target));
        Ok(())
    }

    fn check_reachable(&self, target: &ControlTarget) -> Result<(), Error> {
        if let Some(snapshot) = self.core.cache.read() {
            target.check_board_count(snapshot.board_count)?;
        }
        Ok(())
    }

    fn apply_target(&self, target: Option<ControlTarget>) {
        let (before, after) = {
            let mut controller = self.core.controller.lock();
            let before = controller.suspend_reason();
            controller.set_target(target);
            (before, controller.suspend_reason())
        };
        if target.is_some() {
            self.core.publish_suspension(before, after);
            self.core.control.request_refresh();
        }
    }

    // ========== Operator commands ==========

    /// Selects a tuning profile.
    ///
    /// # Errors
    ///
    /// - `Error::Value` with `ValueError::UnknownProfile` if the device
    ///   reported its profiles and `name` is not one of them
    /// - `Error::Command` if the command failed
    pub async fn set_profile(&self, name: impl Into<String>) -> Result<Ack, Error> {
        let name = name.into();
        if let Some(snapshot) = self.core.cache.read()
            && !snapshot.available_profiles.is_empty()
            && !snapshot.offers_profile(&name)
        {
            return Err(ValueError::UnknownProfile(name).into());
        }
        self.core.operator(ControlCommand::SetProfile { name }).await
    }

    /// Enables or disables ATM auto-tuning.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command failed.
    pub async fn set_atm(&self, enabled: bool) -> Result<Ack, Error> {
        self.core.operator(ControlCommand::SetAtm { enabled }).await
    }

    /// Curtails hashing. The power controller stays suspended until
    /// [`wake`](Self::wake) succeeds and the device reports itself awake.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command failed.
    pub async fn sleep(&self) -> Result<Ack, Error> {
        self.core.controller.lock().set_sleep_requested(true);
        let result = self.core.operator(ControlCommand::Sleep).await;
        if result.is_err() {
            self.core.controller.lock().set_sleep_requested(false);
        }
        result
    }

    /// Resumes hashing after curtailment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command failed.
    pub async fn wake(&self) -> Result<Ack, Error> {
        let ack = self.core.operator(ControlCommand::Wake).await?;
        self.core.controller.lock().set_sleep_requested(false);
        Ok(ack)
    }

    /// Reboots the device.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command failed.
    pub async fn reboot(&self) -> Result<Ack, Error> {
        self.core.operator(ControlCommand::Reboot).await
    }

    /// Restarts the mining application.
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` if the command failed.
    pub async fn reset(&self) -> Result<Ack, Error> {
        self.core.operator(ControlCommand::Reset).await
    }
}

impl<T> Drop for Miner<T> {
    fn drop(&mut self) {
        self.core.control.stop();
        self.core.cache.close();
    }
}
