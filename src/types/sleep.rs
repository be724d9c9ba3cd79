// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hashing curtailment state.

use std::fmt;

use serde::Serialize;

/// Whether the device is hashing.
///
/// Derived from the `CurtailMode` field of the `config` query.
///
/// # Examples
///
/// ```
/// use luxos_sync::types::SleepState;
///
/// assert_eq!(SleepState::from_curtail_mode("None"), SleepState::Awake);
/// assert_eq!(SleepState::from_curtail_mode("WakeUp"), SleepState::Waking);
/// assert_eq!(SleepState::from_curtail_mode("Sleep"), SleepState::Sleeping);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SleepState {
    /// Hashing normally.
    #[default]
    Awake,
    /// Curtailed.
    Sleeping,
    /// Leaving curtailment.
    Waking,
}

impl SleepState {
    /// Maps a LuxOS curtail mode to a sleep state.
    ///
    /// Any mode other than `None` or a wake-up mode counts as curtailed.
    #[must_use]
    pub fn from_curtail_mode(mode: &str) -> Self {
        match mode.trim() {
            "None" | "" => Self::Awake,
            m if m.eq_ignore_ascii_case("wakeup") => Self::Waking,
            _ => Self::Sleeping,
        }
    }

    /// Returns a lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Awake => "awake",
            Self::Sleeping => "sleeping",
            Self::Waking => "waking",
        }
    }

    /// Returns `true` when hashing normally.
    #[must_use]
    pub const fn is_awake(&self) -> bool {
        matches!(self, Self::Awake)
    }
}

impl fmt::Display for SleepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
