// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state: immutable snapshots and the cache holding the latest one.
//!
//! The [`DeviceSnapshot`] is produced once per successful poll round by the
//! telemetry normalizer. The [`StateCache`] publishes it to readers and
//! tracks consecutive poll failures to derive the online flag.

mod cache;
pub(crate) mod snapshot;

pub use cache::{StateCache, Transition};
pub use snapshot::{DeviceSnapshot, FieldIssue, IssueKind};
