// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types carried by device snapshots.
//!
//! # Types
//!
//! - [`SleepState`] - Awake / Sleeping / Waking, from the curtail mode
//! - [`Hashrate`] - Hashrate averages in TH/s
//! - [`ShareCounters`] - Accepted / rejected / stale shares
//! - [`ProfileInfo`] - A tuning profile offered by the device

mod hashrate;
mod profile;
mod shares;
mod sleep;

pub use hashrate::Hashrate;
pub use profile::ProfileInfo;
pub use shares::ShareCounters;
pub use sleep::SleepState;
