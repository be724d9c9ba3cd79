// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synchronizer event types.

use serde::Serialize;

use crate::control::SuspendReason;

use super::DeviceId;

/// Notable changes reported by a running synchronizer.
///
/// Snapshots themselves are delivered through the watch channel of the
/// state cache; events cover the transitions observers usually want to
/// alert on.
///
/// # Examples
///
/// ```
/// use luxos_sync::event::{DeviceId, SyncEvent};
///
/// let device_id = DeviceId::new();
/// let event = SyncEvent::offline(device_id, 3);
/// assert_eq!(event.device_id(), device_id);
/// assert!(event.is_connection());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SyncEvent {
    /// A poll succeeded after the device was offline or never seen.
    Online {
        /// The device.
        device_id: DeviceId,
    },

    /// Consecutive poll failures reached the offline threshold.
    Offline {
        /// The device.
        device_id: DeviceId,
        /// Failed polls in a row.
        failures: u32,
    },

    /// Share counters decreased, so the device most likely restarted.
    CounterReset {
        /// The device.
        device_id: DeviceId,
    },

    /// The power controller stopped issuing commands.
    ControllerSuspended {
        /// The device.
        device_id: DeviceId,
        /// Why control is suspended.
        reason: SuspendReason,
    },

    /// The power controller resumed after a suspension.
    ControllerResumed {
        /// The device.
        device_id: DeviceId,
    },

    /// A command failed or was rejected by the device.
    CommandFailed {
        /// The device.
        device_id: DeviceId,
        /// The LuxOS command name.
        command: &'static str,
        /// Error description.
        error: String,
    },
}

impl SyncEvent {
    /// Returns the device ID associated with this event.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        match self {
            Self::Online { device_id }
            | Self::Offline { device_id, .. }
            | Self::CounterReset { device_id }
            | Self::ControllerSuspended { device_id, .. }
            | Self::ControllerResumed { device_id }
            | Self::CommandFailed { device_id, .. } => *device_id,
        }
    }

    /// Returns `true` for online and offline transitions.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Online { .. } | Self::Offline { .. })
    }

    /// Returns `true` for controller suspend and resume events.
    #[must_use]
    pub fn is_controller(&self) -> bool {
        matches!(
            self,
            Self::ControllerSuspended { .. } | Self::ControllerResumed { .. }
        )
    }

    /// Creates an online event.
    #[must_use]
    pub fn online(device_id: DeviceId) -> Self {
        Self::Online { device_id }
    }

    /// Creates an offline event.
    #[must_use]
    pub fn offline(device_id: DeviceId, failures: u32) -> Self {
        Self::Offline {
            device_id,
            failures,
        }
    }

    /// Creates a command failure event.
    #[must_use]
    pub fn command_failed(
        device_id: DeviceId,
        command: &'static str,
        error: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            device_id,
            command,
            error: error.into(),
        }
    }
}
