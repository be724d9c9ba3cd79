// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Share counter delta tracking across polls.

use crate::types::ShareCounters;

/// Result of observing a fresh set of counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShareObservation {
    /// Increase since the previous observation.
    pub delta: Option<ShareCounters>,
    /// The counters went backwards: the miner restarted.
    pub reset: bool,
}

/// Tracks share counters between consecutive polls.
///
/// A decrease resets the baseline instead of producing a negative rate.
#[derive(Debug, Default)]
pub(crate) struct ShareTracker {
    baseline: Option<ShareCounters>,
}

impl ShareTracker {
    pub fn observe(&mut self, counters: ShareCounters) -> ShareObservation {
        let observation = match self.baseline {
            None => ShareObservation {
                delta: None,
                reset: false,
            },
            Some(previous) if counters.is_reset_from(&previous) => {
                tracing::warn!(
                    previous_accepted = previous.accepted,
                    accepted = counters.accepted,
                    "Share counters decreased, miner restart detected"
                );
                ShareObservation {
                    delta: None,
                    reset: true,
                }
            }
            Some(previous) => ShareObservation {
                delta: counters.delta_since(&previous),
                reset: false,
            },
        };
        self.baseline = Some(counters);
        observation
    }
}
