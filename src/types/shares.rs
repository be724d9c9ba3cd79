// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Share counters.

use serde::Serialize;

/// Share counters since the last miner restart.
///
/// The device only ever increases these; a decrease means the miner
/// restarted and its counters started over.
///
/// # Examples
///
/// ```
/// use luxos_sync::types::ShareCounters;
///
/// let before = ShareCounters { accepted: 100, rejected: 2, stale: 0 };
/// let after = ShareCounters { accepted: 130, rejected: 2, stale: 1 };
/// let delta = after.delta_since(&before).unwrap();
/// assert_eq!(delta.accepted, 30);
///
/// // A restart resets the counters: no delta, never a negative one.
/// let restarted = ShareCounters { accepted: 4, rejected: 0, stale: 0 };
/// assert!(restarted.delta_since(&after).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ShareCounters {
    /// Shares accepted by the pool.
    pub accepted: u64,
    /// Shares rejected by the pool.
    pub rejected: u64,
    /// Stale shares.
    pub stale: u64,
}

impl ShareCounters {
    /// Returns `true` if any counter is lower than in `previous`.
    #[must_use]
    pub fn is_reset_from(&self, previous: &Self) -> bool {
        self.accepted < previous.accepted
            || self.rejected < previous.rejected
            || self.stale < previous.stale
    }

    /// Returns the increase since `previous`, or `None` after a reset.
    #[must_use]
    pub fn delta_since(&self, previous: &Self) -> Option<Self> {
        Some(Self {
            accepted: self.accepted.checked_sub(previous.accepted)?,
            rejected: self.rejected.checked_sub(previous.rejected)?,
            stale: self.stale.checked_sub(previous.stale)?,
        })
    }
}
