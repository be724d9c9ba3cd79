// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serialized submission of side-effecting commands.
//!
//! Every command, whether issued by the control loop or by an operator, goes
//! through one [`CommandGateway`]. The gateway guarantees:
//!
//! - at most one command in flight at any time
//! - a minimum spacing between two consecutive commands
//! - exactly one execution per submission (no silent re-issue of a stateful
//!   action)
//!
//! Two submission styles exist. [`CommandGateway::try_submit`] never waits and
//! fails with `Busy` or `Throttled`; the control loop uses it and simply skips
//! the cycle. [`CommandGateway::submit`] waits up to a bounded budget for the
//! slot and the spacing; operator commands use it.

mod session;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::command::{Command, ControlCommand};
use crate::error::CommandError;
use crate::protocol::{DeviceLink, Transport};

/// Acknowledgement of an executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// The LuxOS command name.
    pub command: &'static str,
    /// Status message reported by the device, if any.
    pub message: Option<String>,
    /// When the command was issued.
    pub issued_at: DateTime<Utc>,
}

/// Single queue for all outbound commands to one device.
#[derive(Debug)]
pub struct CommandGateway<T> {
    link: Arc<DeviceLink<T>>,
    /// Held for the whole execution; stores when the last command was issued.
    slot: Mutex<Option<Instant>>,
    min_spacing: Duration,
}

impl<T: Transport> CommandGateway<T> {
    /// Creates a gateway issuing commands over `link` at most once per
    /// `min_spacing`.
    #[must_use]
    pub fn new(link: Arc<DeviceLink<T>>, min_spacing: Duration) -> Self {
        Self {
            link,
            slot: Mutex::new(None),
            min_spacing,
        }
    }

    /// Returns the minimum spacing between two commands.
    #[must_use]
    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Returns `true` while a command is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.slot.try_lock().is_err()
    }

    /// Submits `command` without waiting.
    ///
    /// # Errors
    ///
    /// - `CommandError::Busy` if another command is in flight
    /// - `CommandError::Throttled` if the spacing since the last command has
    ///   not elapsed
    /// - any execution error, see [`submit`](Self::submit)
    pub async fn try_submit(&self, command: &ControlCommand) -> Result<Ack, CommandError> {
        let slot = self.slot.try_lock().map_err(|_| CommandError::Busy)?;
        if let Some(ready) = self.ready_at(*slot) {
            let now = Instant::now();
            if ready > now {
                return Err(CommandError::Throttled { wait: ready - now });
            }
        }
        self.execute(slot, command).await
    }

    /// Submits `command`, waiting up to `max_wait` for the slot and the
    /// spacing.
    ///
    /// The wait covers only the queueing; the execution itself is bounded by
    /// the transport timeout and retry policy.
    ///
    /// # Errors
    ///
    /// - `CommandError::Timeout` if the command could not be issued within
    ///   `max_wait`
    /// - `CommandError::SessionConflict` if another write session is open
    /// - `CommandError::Rejected` if the device refused the command
    /// - `CommandError::Transport` if the command could not be delivered
    pub async fn submit(
        &self,
        command: &ControlCommand,
        max_wait: Duration,
    ) -> Result<Ack, CommandError> {
        let deadline = Instant::now() + max_wait;
        let slot = tokio::time::timeout_at(deadline, self.slot.lock())
            .await
            .map_err(|_| CommandError::Timeout(max_wait))?;

        if let Some(ready) = self.ready_at(*slot) {
            if ready > deadline {
                return Err(CommandError::Timeout(max_wait));
            }
            tokio::time::sleep_until(ready).await;
        }
        self.execute(slot, command).await
    }

    fn ready_at(&self, last_issued: Option<Instant>) -> Option<Instant> {
        last_issued.map(|last| last + self.min_spacing)
    }

    async fn execute(
        &self,
        mut slot: MutexGuard<'_, Option<Instant>>,
        command: &ControlCommand,
    ) -> Result<Ack, CommandError> {
        // Spacing counts from every attempt, successful or not.
        *slot = Some(Instant::now());
        let issued_at = Utc::now();

        tracing::info!(command = command.name(), parameter = ?command.parameter(), "Issuing command");

        let link = self.link.acquire().await;
        let response = session::run_in_session(&link, command).await?;

        Ok(Ack {
            command: command.name(),
            message: response.message().map(str::to_string),
            issued_at,
        })
    }
}
