// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device snapshot produced by one successful poll round.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Hashrate, ProfileInfo, ShareCounters, SleepState};

/// How a field's value was obtained when the device did not report it
/// cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    /// Reported out of range; clamped to the nearest bound.
    Clamped,
    /// Missing; carried over from the previous snapshot.
    Substituted,
    /// Missing with no previous value; set to a default.
    Defaulted,
}

/// A field that needed special handling during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FieldIssue {
    /// Snapshot field name.
    pub field: &'static str,
    /// What was done to it.
    pub kind: IssueKind,
}

/// An immutable, fully populated view of the device for one poll cycle.
///
/// Snapshots are only ever replaced wholesale by the
/// [`StateCache`](crate::state::StateCache).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    /// When the poll round completed.
    pub captured_at: DateTime<Utc>,

    /// LuxOS firmware version (device identity).
    pub firmware_version: String,
    /// Hardware model, if reported.
    pub model: Option<String>,
    /// Device hostname, if reported.
    pub hostname: Option<String>,

    /// Hashrate averages.
    pub hashrate: Hashrate,
    /// Measured power draw in watts.
    pub power_watts: f64,
    /// Watts per TH/s; `None` when hashrate or power is zero.
    pub efficiency_w_per_th: Option<f64>,
    /// Hottest board sensor in °C.
    pub board_temp_max: Option<f64>,
    /// Average fan duty, 0-100 %.
    pub fan_speed_avg_pct: Option<f64>,
    /// Average fan RPM.
    pub fan_rpm_avg: Option<f64>,
    /// Temperature the firmware regulates towards, in °C.
    pub temp_target: Option<f64>,

    /// Share counters since the last miner restart.
    pub shares: ShareCounters,
    /// Increase since the previous snapshot; `None` after a restart or on
    /// the first snapshot.
    pub share_delta: Option<ShareCounters>,
    /// The counters went backwards since the previous snapshot.
    pub restart_detected: bool,
    /// Hardware errors since the last miner restart.
    pub hardware_errors: u64,
    /// Seconds since the miner started.
    pub uptime_secs: u64,

    /// The active pool is alive.
    pub pool_connected: bool,
    /// Active pool URL; empty when disconnected.
    pub active_pool_url: String,
    /// Worker name on the active pool.
    pub active_pool_user: Option<String>,
    /// Stratum difficulty on the active pool.
    pub active_pool_difficulty: Option<f64>,

    /// Current tuning profile, last known when offline.
    pub profile_name: Option<String>,
    /// Profiles the device offers.
    pub available_profiles: Vec<ProfileInfo>,
    /// ATM auto-tuning is enabled.
    pub atm_enabled: bool,
    /// The miner is currently tuning.
    pub is_tuning: bool,
    /// Curtailment state, last known when offline.
    pub sleep_state: SleepState,
    /// The device answered at least one of the recent polls.
    pub online: bool,

    /// Number of hash boards.
    pub board_count: u32,
    /// Total number of chips over all boards.
    pub chip_count: u32,

    /// Fields that were clamped, substituted or defaulted.
    pub issues: Vec<FieldIssue>,
}

impl DeviceSnapshot {
    /// Time elapsed since this snapshot was captured.
    #[must_use]
    pub fn staleness(&self) -> Duration {
        (Utc::now() - self.captured_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Returns `true` if `field` needed the given handling.
    #[must_use]
    pub fn has_issue(&self, field: &str, kind: IssueKind) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.field == field && issue.kind == kind)
    }

    /// Returns `true` if the power reading came from the device this round.
    ///
    /// A clamped reading still counts; a carried-over or defaulted one does
    /// not.
    #[must_use]
    pub fn power_is_measured(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|issue| issue.field == "power_watts" && issue.kind != IssueKind::Clamped)
    }

    /// Returns `true` if the device offers a profile named `name`.
    #[must_use]
    pub fn offers_profile(&self, name: &str) -> bool {
        self.available_profiles.iter().any(|p| p.name == name)
    }

    /// Returns a copy marked offline, keeping every other field.
    #[must_use]
    pub fn to_offline(&self) -> Self {
        Self {
            online: false,
            ..self.clone()
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_snapshot(power_watts: f64) -> DeviceSnapshot {
    DeviceSnapshot {
        captured_at: Utc::now(),
        firmware_version: "2024.5.1".to_string(),
        model: Some("S19j Pro".to_string()),
        hostname: Some("miner-01".to_string()),
        hashrate: Hashrate {
            five_sec: 100.0,
            one_min: 100.0,
            fifteen_min: 100.0,
            thirty_min: 100.0,
            average: 100.0,
        },
        power_watts,
        efficiency_w_per_th: Some(power_watts / 100.0),
        board_temp_max: Some(70.0),
        fan_speed_avg_pct: Some(60.0),
        fan_rpm_avg: Some(4200.0),
        temp_target: Some(75.0),
        shares: ShareCounters::default(),
        share_delta: None,
        restart_detected: false,
        hardware_errors: 0,
        uptime_secs: 3600,
        pool_connected: true,
        active_pool_url: "pool.example.com".to_string(),
        active_pool_user: None,
        active_pool_difficulty: None,
        profile_name: Some("default".to_string()),
        available_profiles: vec![ProfileInfo::named("default")],
        atm_enabled: false,
        is_tuning: false,
        sleep_state: SleepState::Awake,
        online: true,
        board_count: 3,
        chip_count: 378,
        issues: Vec::new(),
    }
}
