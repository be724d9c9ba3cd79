// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hashrate averages.

use serde::Serialize;

/// Hashrate averages in TH/s over the windows reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Hashrate {
    /// Last five seconds.
    pub five_sec: f64,
    /// Last minute.
    pub one_min: f64,
    /// Last fifteen minutes.
    pub fifteen_min: f64,
    /// Last thirty minutes.
    pub thirty_min: f64,
    /// Since the miner started.
    pub average: f64,
}

impl Hashrate {
    /// Converts a GH/s reading to TH/s.
    #[must_use]
    pub fn ths_from_ghs(ghs: f64) -> f64 {
        ghs / 1000.0
    }

    /// Returns `true` if the short-window hashrate is zero.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.five_sec <= 0.0
    }
}
