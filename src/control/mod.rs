// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed-loop power-limit control.
//!
//! An operator sets a [`ControlTarget`]; the [`PowerController`] compares it
//! with every fresh snapshot and proposes bounded adjustments of the device
//! power limit until the measured draw settles within tolerance.

mod controller;
mod target;

pub use controller::{
    ControllerMode, ControllerStatus, Decision, PowerController, SkipReason, SuspendReason,
};
pub use target::ControlTarget;
