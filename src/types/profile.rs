// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tuning profiles offered by the device.

use serde::Serialize;

/// A tuning profile listed by the `profiles` query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileInfo {
    /// Profile name, as accepted by `profileset`.
    pub name: String,
    /// Nominal power draw, if reported.
    pub watts: Option<f64>,
    /// Nominal hashrate in TH/s, if reported.
    pub hashrate_ths: Option<f64>,
}

impl ProfileInfo {
    /// Creates a profile entry with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            watts: None,
            hashrate_ths: None,
        }
    }
}
