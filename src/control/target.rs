// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operator power target.

use serde::Serialize;

use crate::config::ControlConfig;
use crate::error::ValueError;

/// A power target with its safety bounds and loop tuning.
///
/// Unless overridden with [`with_power_bounds`](Self::with_power_bounds),
/// the bounds scale with the number of hash boards the device reports; the
/// configured bounds apply until the board count is known.
///
/// # Examples
///
/// ```
/// use luxos_sync::config::ControlConfig;
/// use luxos_sync::control::ControlTarget;
///
/// let target = ControlTarget::new(3000.0, &ControlConfig::default()).unwrap();
/// assert_eq!(target.target_power_watts(), 3000.0);
/// assert_eq!(target.max_power_watts(), 3900.0);
///
/// // Outside the safety bounds
/// assert!(ControlTarget::new(5000.0, &ControlConfig::default()).is_err());
///
/// // A single-board unit gets 350-1300 W
/// assert_eq!(target.bounds_for(1), (350.0, 1300.0));
/// assert!(target.check_board_count(1).is_err());
///
/// let narrow = ControlTarget::new(3000.0, &ControlConfig::default())
///     .unwrap()
///     .with_power_bounds(2500.0, 3200.0)
///     .with_settle_tolerance_watts(25.0);
/// assert!(narrow.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlTarget {
    target_power_watts: f64,
    min_power_watts: f64,
    max_power_watts: f64,
    board_min_watts: f64,
    board_max_watts: f64,
    explicit_bounds: bool,
    step_limit_watts: f64,
    settle_tolerance_watts: f64,
}

impl ControlTarget {
    /// Creates a target using the bounds and tuning of `config`.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the target is outside the
    /// configured safety bounds.
    pub fn new(target_power_watts: f64, config: &ControlConfig) -> Result<Self, ValueError> {
        let target = Self {
            target_power_watts,
            min_power_watts: config.min_power_watts(),
            max_power_watts: config.max_power_watts(),
            board_min_watts: config.board_min_watts(),
            board_max_watts: config.board_max_watts(),
            explicit_bounds: false,
            step_limit_watts: config.step_limit_watts(),
            settle_tolerance_watts: config.settle_tolerance_watts(),
        };
        target.validate()?;
        Ok(target)
    }

    /// Overrides the safety bounds for any board count. Call
    /// [`validate`](Self::validate) after.
    #[must_use]
    pub fn with_power_bounds(mut self, min_watts: f64, max_watts: f64) -> Self {
        self.min_power_watts = min_watts;
        self.max_power_watts = max_watts;
        self.explicit_bounds = true;
        self
    }

    /// Overrides the maximum single adjustment.
    #[must_use]
    pub fn with_step_limit_watts(mut self, watts: f64) -> Self {
        self.step_limit_watts = watts;
        self
    }

    /// Overrides the dead-band.
    #[must_use]
    pub fn with_settle_tolerance_watts(mut self, watts: f64) -> Self {
        self.settle_tolerance_watts = watts;
        self
    }

    /// Returns the desired power draw.
    #[must_use]
    pub fn target_power_watts(&self) -> f64 {
        self.target_power_watts
    }

    /// Returns the lowest power limit that may be issued.
    #[must_use]
    pub fn min_power_watts(&self) -> f64 {
        self.min_power_watts
    }

    /// Returns the highest power limit that may be issued.
    #[must_use]
    pub fn max_power_watts(&self) -> f64 {
        self.max_power_watts
    }

    /// Returns the `(min, max)` power limits for a device with
    /// `board_count` hash boards.
    #[must_use]
    pub fn bounds_for(&self, board_count: u32) -> (f64, f64) {
        if self.explicit_bounds || board_count == 0 {
            return (self.min_power_watts, self.max_power_watts);
        }
        let boards = f64::from(board_count);
        (self.board_min_watts * boards, self.board_max_watts * boards)
    }

    /// Checks that the target is reachable on a device with `board_count`
    /// hash boards.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the target lies outside
    /// [`bounds_for`](Self::bounds_for).
    pub fn check_board_count(&self, board_count: u32) -> Result<(), ValueError> {
        let (min, max) = self.bounds_for(board_count);
        ValueError::check_range("target_power_watts", self.target_power_watts, min, max)
    }

    /// Returns the maximum single adjustment.
    #[must_use]
    pub fn step_limit_watts(&self) -> f64 {
        self.step_limit_watts
    }

    /// Returns the dead-band.
    #[must_use]
    pub fn settle_tolerance_watts(&self) -> f64 {
        self.settle_tolerance_watts
    }

    /// Checks bounds ordering, target placement and tuning values.
    ///
    /// # Errors
    ///
    /// Returns the first `ValueError` found.
    pub fn validate(&self) -> Result<(), ValueError> {
        ValueError::check_range("min_power_watts", self.min_power_watts, 0.0, f64::MAX)?;
        ValueError::check_range(
            "max_power_watts",
            self.max_power_watts,
            self.min_power_watts,
            f64::from(u32::MAX),
        )?;
        ValueError::check_range(
            "target_power_watts",
            self.target_power_watts,
            self.min_power_watts,
            self.max_power_watts,
        )?;
        ValueError::check_range(
            "step_limit_watts",
            self.step_limit_watts,
            f64::MIN_POSITIVE,
            f64::MAX,
        )?;
        ValueError::check_range(
            "settle_tolerance_watts",
            self.settle_tolerance_watts,
            0.0,
            f64::MAX,
        )
    }
}
