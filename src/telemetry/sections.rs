// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire shapes of the LuxOS response sections.
//!
//! Every field is optional: a missing or unusable value is resolved later
//! by the normalizer, never by failing the section.

use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::Value;

use super::lenient;

/// Entry of the `VERSION` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct VersionEntry {
    /// Firmware version; kept raw so a non-string value can be reported.
    #[serde(rename = "LUXminer", default)]
    pub luxminer: Option<Value>,
    #[serde(rename = "Type", default, deserialize_with = "lenient::text")]
    pub model: Option<String>,
}

/// Entry of the `SUMMARY` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SummaryEntry {
    #[serde(rename = "GHS 5s", default, deserialize_with = "lenient::float")]
    pub ghs_5s: Option<f64>,
    #[serde(rename = "GHS 1m", default, deserialize_with = "lenient::float")]
    pub ghs_1m: Option<f64>,
    #[serde(rename = "GHS 15m", default, deserialize_with = "lenient::float")]
    pub ghs_15m: Option<f64>,
    #[serde(rename = "GHS 30m", default, deserialize_with = "lenient::float")]
    pub ghs_30m: Option<f64>,
    #[serde(rename = "GHS av", default, deserialize_with = "lenient::float")]
    pub ghs_av: Option<f64>,
    #[serde(rename = "Accepted", default, deserialize_with = "lenient::unsigned")]
    pub accepted: Option<u64>,
    #[serde(rename = "Rejected", default, deserialize_with = "lenient::unsigned")]
    pub rejected: Option<u64>,
    #[serde(rename = "Stale", default, deserialize_with = "lenient::unsigned")]
    pub stale: Option<u64>,
    #[serde(rename = "Hardware Errors", default, deserialize_with = "lenient::unsigned")]
    pub hardware_errors: Option<u64>,
    #[serde(rename = "Elapsed", default, deserialize_with = "lenient::unsigned")]
    pub elapsed: Option<u64>,
}

/// Entry of the `POWER` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PowerEntry {
    #[serde(rename = "Watts", default, deserialize_with = "lenient::float")]
    pub watts: Option<f64>,
}

/// Entry of the `TEMPS` section (one per board).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TempEntry {
    #[serde(default, deserialize_with = "lenient::float")]
    pub top_left: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub top_right: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub bottom_left: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub bottom_right: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub board: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub chip: Option<f64>,
}

impl TempEntry {
    /// Every sensor reading present on this board.
    pub fn readings(&self) -> impl Iterator<Item = f64> {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
            self.board,
            self.chip,
        ]
        .into_iter()
        .flatten()
    }
}

/// Entry of the `FANS` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FanEntry {
    #[serde(rename = "RPM", default, deserialize_with = "lenient::float")]
    pub rpm: Option<f64>,
    #[serde(rename = "Speed", default, deserialize_with = "lenient::float")]
    pub speed: Option<f64>,
}

/// Entry of the `POOLS` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PoolEntry {
    #[serde(rename = "URL", default, deserialize_with = "lenient::text")]
    pub url: Option<String>,
    #[serde(rename = "Stratum URL", default, deserialize_with = "lenient::text")]
    pub stratum_url: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "lenient::text")]
    pub status: Option<String>,
    #[serde(rename = "Stratum Active", default, deserialize_with = "lenient::flag")]
    pub stratum_active: Option<bool>,
    #[serde(rename = "User", default, deserialize_with = "lenient::text")]
    pub user: Option<String>,
    #[serde(rename = "Stratum Difficulty", default, deserialize_with = "lenient::float")]
    pub difficulty: Option<f64>,
}

impl PoolEntry {
    /// The pool reports itself alive.
    pub fn is_alive(&self) -> bool {
        self.status.as_deref() == Some("Alive")
    }

    /// The pool is alive and is the one currently hashing.
    pub fn is_active(&self) -> bool {
        self.is_alive() && self.stratum_active == Some(true)
    }

    /// Stratum URL, falling back to the configured URL.
    pub fn address(&self) -> Option<&str> {
        self.stratum_url.as_deref().or(self.url.as_deref())
    }
}

/// Entry of the `PROFILES` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProfileEntry {
    #[serde(rename = "Profile Name", default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(rename = "Watts", default, deserialize_with = "lenient::float")]
    pub watts: Option<f64>,
    #[serde(rename = "Hashrate", default, deserialize_with = "lenient::float")]
    pub hashrate: Option<f64>,
}

/// Entry of the `ATM` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AtmEntry {
    #[serde(rename = "Enabled", default, deserialize_with = "lenient::flag")]
    pub enabled: Option<bool>,
}

/// Entry of the `CONFIG` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ConfigEntry {
    #[serde(rename = "Profile", default, deserialize_with = "lenient::text")]
    pub profile: Option<String>,
    #[serde(rename = "CurtailMode", default, deserialize_with = "lenient::text")]
    pub curtail_mode: Option<String>,
    #[serde(rename = "IsTuning", default, deserialize_with = "lenient::flag")]
    pub is_tuning: Option<bool>,
    #[serde(rename = "Hostname", default, deserialize_with = "lenient::text")]
    pub hostname: Option<String>,
    #[serde(rename = "Model", default, deserialize_with = "lenient::text")]
    pub model: Option<String>,
}

/// Entry of the `DEVS` section; only counted.
pub(crate) type DevEntry = IgnoredAny;

/// Entry of the `DEVDETAILS` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DevDetailEntry {
    #[serde(rename = "Chips", default, deserialize_with = "lenient::unsigned")]
    pub chips: Option<u64>,
}

/// Entry of the `TEMPCTRL` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TempCtrlEntry {
    #[serde(rename = "Target", default, deserialize_with = "lenient::float")]
    pub target: Option<f64>,
}
