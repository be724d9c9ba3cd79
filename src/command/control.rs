// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Side-effecting control commands.

use crate::command::Command;

/// Wake-up mode sent with the curtail command.
const WAKEUP_MODE: &str = "safe";

/// Command that changes device state.
///
/// All control commands require a write session and go through the
/// command gateway, which issues each submission exactly once.
///
/// # Examples
///
/// ```
/// use luxos_sync::command::{Command, ControlCommand};
///
/// let cmd = ControlCommand::SetProfile { name: "415MHz".into() };
/// assert_eq!(cmd.name(), "profileset");
/// assert_eq!(cmd.parameter(), Some("0,415MHz".to_string()));
///
/// let wake = ControlCommand::Wake;
/// assert_eq!(wake.parameter(), Some("wakeup,mode=safe".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Select a tuning profile (applied to all boards).
    SetProfile {
        /// Profile name as listed by the `profiles` query.
        name: String,
    },
    /// Set the device power limit.
    SetPowerTarget {
        /// Power limit in watts.
        watts: u32,
    },
    /// Enable or disable ATM auto-tuning.
    SetAtm {
        /// Whether ATM should be enabled.
        enabled: bool,
    },
    /// Curtail hashing (sleep).
    Sleep,
    /// Resume hashing after curtailment.
    Wake,
    /// Reboot the whole device.
    Reboot,
    /// Restart the mining application.
    Reset,
}

impl Command for ControlCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::SetProfile { .. } => "profileset",
            Self::SetPowerTarget { .. } => "powertargetset",
            Self::SetAtm { .. } => "atmset",
            Self::Sleep | Self::Wake => "curtail",
            Self::Reboot => "rebootdevice",
            Self::Reset => "resetminer",
        }
    }

    fn parameter(&self) -> Option<String> {
        match self {
            // Board 0 addresses every board.
            Self::SetProfile { name } => Some(format!("0,{name}")),
            Self::SetPowerTarget { watts } => Some(format!("power={watts}")),
            Self::SetAtm { enabled } => Some(format!("enabled={enabled}")),
            Self::Sleep => Some("sleep".to_string()),
            Self::Wake => Some(format!("wakeup,mode={WAKEUP_MODE}")),
            Self::Reboot | Self::Reset => None,
        }
    }

    fn is_side_effecting(&self) -> bool {
        true
    }
}
