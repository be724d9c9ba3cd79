// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only telemetry commands.

use crate::command::Command;

/// Read-only command polled during a telemetry round.
///
/// Each query answers with one upper-case section in the response body,
/// see [`QueryCommand::section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryCommand {
    /// Firmware and model identity.
    Version,
    /// Hashrate and share counters.
    Summary,
    /// Measured power draw.
    Power,
    /// Per-board temperature sensors.
    Temps,
    /// Fan speed and RPM.
    Fans,
    /// Pool configuration and status.
    Pools,
    /// Available tuning profiles.
    Profiles,
    /// Auto-tuning (ATM) configuration.
    Atm,
    /// Miner configuration, current profile and curtailment.
    Config,
    /// Hash boards.
    Devs,
    /// Hash board details (chip counts).
    DevDetails,
    /// Temperature control settings.
    TempCtrl,
}

impl QueryCommand {
    /// Every query, in the order a poll round issues them.
    ///
    /// `Version` comes first: it carries the device identity and doubles
    /// as the reachability probe for the round.
    pub const POLL_ROUND: [Self; 12] = [
        Self::Version,
        Self::Summary,
        Self::Power,
        Self::Temps,
        Self::Fans,
        Self::Pools,
        Self::Profiles,
        Self::Atm,
        Self::Config,
        Self::Devs,
        Self::DevDetails,
        Self::TempCtrl,
    ];

    /// Returns the response section key holding this query's data.
    #[must_use]
    pub const fn section(self) -> &'static str {
        match self {
            Self::Version => "VERSION",
            Self::Summary => "SUMMARY",
            Self::Power => "POWER",
            Self::Temps => "TEMPS",
            Self::Fans => "FANS",
            Self::Pools => "POOLS",
            Self::Profiles => "PROFILES",
            Self::Atm => "ATM",
            Self::Config => "CONFIG",
            Self::Devs => "DEVS",
            Self::DevDetails => "DEVDETAILS",
            Self::TempCtrl => "TEMPCTRL",
        }
    }
}

impl Command for QueryCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Summary => "summary",
            Self::Power => "power",
            Self::Temps => "temps",
            Self::Fans => "fans",
            Self::Pools => "pools",
            Self::Profiles => "profiles",
            Self::Atm => "atm",
            Self::Config => "config",
            Self::Devs => "devs",
            Self::DevDetails => "devdetails",
            Self::TempCtrl => "tempctrl",
        }
    }

    fn parameter(&self) -> Option<String> {
        None
    }
}
