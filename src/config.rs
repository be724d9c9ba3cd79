// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synchronizer configuration.
//!
//! All configuration types are plain builders: start from `default()`, adjust
//! with `with_*` methods, and call `validate()` (the [`Miner`](crate::Miner)
//! builder does this for you).
//!
//! # Examples
//!
//! ```
//! use luxos_sync::config::{ControlConfig, SyncConfig};
//! use std::time::Duration;
//!
//! let config = SyncConfig::default()
//!     .with_poll_interval(Duration::from_secs(5))
//!     .with_control(ControlConfig::default().with_step_limit_watts(150.0));
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use crate::error::ValueError;
use crate::protocol::RetryPolicy;

// ============================================================================
// ControlConfig
// ============================================================================

/// Tuning of the power control loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlConfig {
    step_limit_watts: f64,
    settle_tolerance_watts: f64,
    min_power_watts: f64,
    max_power_watts: f64,
    board_min_watts: f64,
    board_max_watts: f64,
    gain: f64,
    min_change_watts: f64,
    no_progress_cap: u32,
    failure_limit: u32,
}

impl ControlConfig {
    /// Default maximum magnitude of one adjustment.
    pub const DEFAULT_STEP_LIMIT_WATTS: f64 = 100.0;
    /// Default dead-band around the target.
    pub const DEFAULT_SETTLE_TOLERANCE_WATTS: f64 = 50.0;
    /// Default lower safety bound while the board count is unknown.
    pub const DEFAULT_MIN_POWER_WATTS: f64 = 350.0;
    /// Default upper safety bound while the board count is unknown.
    pub const DEFAULT_MAX_POWER_WATTS: f64 = 3900.0;
    /// Default lower bound contributed by each hash board.
    pub const DEFAULT_BOARD_MIN_WATTS: f64 = 350.0;
    /// Default upper bound contributed by each hash board.
    pub const DEFAULT_BOARD_MAX_WATTS: f64 = 1300.0;
    /// Default proportional gain.
    pub const DEFAULT_GAIN: f64 = 0.5;
    /// Default smallest change counted as progress.
    pub const DEFAULT_MIN_CHANGE_WATTS: f64 = 1.0;
    /// Default number of negligible adjustments before settling.
    pub const DEFAULT_NO_PROGRESS_CAP: u32 = 3;
    /// Default number of consecutive command failures before suspending.
    pub const DEFAULT_FAILURE_LIMIT: u32 = 3;

    /// Sets the maximum magnitude of one adjustment.
    #[must_use]
    pub fn with_step_limit_watts(mut self, watts: f64) -> Self {
        self.step_limit_watts = watts;
        self
    }

    /// Sets the dead-band around the target.
    #[must_use]
    pub fn with_settle_tolerance_watts(mut self, watts: f64) -> Self {
        self.settle_tolerance_watts = watts;
        self
    }

    /// Sets the safety bounds used while the board count is unknown.
    #[must_use]
    pub fn with_power_bounds(mut self, min_watts: f64, max_watts: f64) -> Self {
        self.min_power_watts = min_watts;
        self.max_power_watts = max_watts;
        self
    }

    /// Sets the per-board safety bounds, scaled by the reported board count.
    #[must_use]
    pub fn with_board_power_bounds(mut self, min_watts: f64, max_watts: f64) -> Self {
        self.board_min_watts = min_watts;
        self.board_max_watts = max_watts;
        self
    }

    /// Sets the proportional gain, in `(0, 1]`.
    #[must_use]
    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    /// Sets the smallest command change counted as progress.
    #[must_use]
    pub fn with_min_change_watts(mut self, watts: f64) -> Self {
        self.min_change_watts = watts;
        self
    }

    /// Sets how many negligible adjustments are tolerated before settling.
    #[must_use]
    pub fn with_no_progress_cap(mut self, cap: u32) -> Self {
        self.no_progress_cap = cap;
        self
    }

    /// Sets how many consecutive command failures suspend the loop.
    #[must_use]
    pub fn with_failure_limit(mut self, limit: u32) -> Self {
        self.failure_limit = limit;
        self
    }

    /// Returns the maximum magnitude of one adjustment.
    #[must_use]
    pub fn step_limit_watts(&self) -> f64 {
        self.step_limit_watts
    }

    /// Returns the dead-band around the target.
    #[must_use]
    pub fn settle_tolerance_watts(&self) -> f64 {
        self.settle_tolerance_watts
    }

    /// Returns the lower safety bound.
    #[must_use]
    pub fn min_power_watts(&self) -> f64 {
        self.min_power_watts
    }

    /// Returns the upper safety bound.
    #[must_use]
    pub fn max_power_watts(&self) -> f64 {
        self.max_power_watts
    }

    /// Returns the lower bound contributed by each hash board.
    #[must_use]
    pub fn board_min_watts(&self) -> f64 {
        self.board_min_watts
    }

    /// Returns the upper bound contributed by each hash board.
    #[must_use]
    pub fn board_max_watts(&self) -> f64 {
        self.board_max_watts
    }

    /// Returns the proportional gain.
    #[must_use]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Returns the smallest command change counted as progress.
    #[must_use]
    pub fn min_change_watts(&self) -> f64 {
        self.min_change_watts
    }

    /// Returns the no-progress cap.
    #[must_use]
    pub fn no_progress_cap(&self) -> u32 {
        self.no_progress_cap
    }

    /// Returns the consecutive command failure limit.
    #[must_use]
    pub fn failure_limit(&self) -> u32 {
        self.failure_limit
    }

    /// Checks the configuration for nonsensical values.
    ///
    /// # Errors
    ///
    /// Returns `ValueError` if a bound is negative or inverted, the gain is
    /// outside `(0, 1]`, or the failure limit is zero.
    pub fn validate(&self) -> Result<(), ValueError> {
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
        )?;
        ValueError::check_range("min_power_watts", self.min_power_watts, 0.0, f64::MAX)?;
        ValueError::check_range(
            "max_power_watts",
            self.max_power_watts,
            self.min_power_watts,
            f64::MAX,
        )?;
        ValueError::check_range("board_min_watts", self.board_min_watts, 0.0, f64::MAX)?;
        ValueError::check_range(
            "board_max_watts",
            self.board_max_watts,
            self.board_min_watts.max(f64::MIN_POSITIVE),
            f64::MAX,
        )?;
        if self.gain <= 0.0 || self.gain > 1.0 || self.gain.is_nan() {
            return Err(ValueError::Invalid {
                field: "gain",
                reason: format!("{} is not in (0, 1]", self.gain),
            });
        }
        ValueError::check_range("min_change_watts", self.min_change_watts, 0.0, f64::MAX)?;
        if self.failure_limit == 0 {
            return Err(ValueError::Invalid {
                field: "failure_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            step_limit_watts: Self::DEFAULT_STEP_LIMIT_WATTS,
            settle_tolerance_watts: Self::DEFAULT_SETTLE_TOLERANCE_WATTS,
            min_power_watts: Self::DEFAULT_MIN_POWER_WATTS,
            max_power_watts: Self::DEFAULT_MAX_POWER_WATTS,
            board_min_watts: Self::DEFAULT_BOARD_MIN_WATTS,
            board_max_watts: Self::DEFAULT_BOARD_MAX_WATTS,
            gain: Self::DEFAULT_GAIN,
            min_change_watts: Self::DEFAULT_MIN_CHANGE_WATTS,
            no_progress_cap: Self::DEFAULT_NO_PROGRESS_CAP,
            failure_limit: Self::DEFAULT_FAILURE_LIMIT,
        }
    }
}

// ============================================================================
// TelemetryLimits
// ============================================================================

/// Plausibility bounds applied while normalizing telemetry.
///
/// Values outside the bounds are clamped and flagged, never rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryLimits {
    min_board_temp: f64,
    max_board_temp: f64,
}

impl TelemetryLimits {
    /// Default lowest plausible board temperature (°C).
    pub const DEFAULT_MIN_BOARD_TEMP: f64 = -40.0;
    /// Default highest plausible board temperature (°C).
    pub const DEFAULT_MAX_BOARD_TEMP: f64 = 150.0;

    /// Sets the plausible board temperature range.
    #[must_use]
    pub fn with_board_temp_range(mut self, min: f64, max: f64) -> Self {
        self.min_board_temp = min;
        self.max_board_temp = max;
        self
    }

    /// Returns the lowest plausible board temperature.
    #[must_use]
    pub fn min_board_temp(&self) -> f64 {
        self.min_board_temp
    }

    /// Returns the highest plausible board temperature.
    #[must_use]
    pub fn max_board_temp(&self) -> f64 {
        self.max_board_temp
    }

    /// Checks that the range is not inverted.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `max < min`.
    pub fn validate(&self) -> Result<(), ValueError> {
        ValueError::check_range(
            "max_board_temp",
            self.max_board_temp,
            self.min_board_temp,
            f64::MAX,
        )
    }
}

impl Default for TelemetryLimits {
    fn default() -> Self {
        Self {
            min_board_temp: Self::DEFAULT_MIN_BOARD_TEMP,
            max_board_temp: Self::DEFAULT_MAX_BOARD_TEMP,
        }
    }
}

// ============================================================================
// SyncConfig
// ============================================================================

/// Configuration of one device synchronizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    poll_interval: Duration,
    offline_threshold: u32,
    command_interval: Duration,
    operator_wait: Duration,
    retry: RetryPolicy,
    control: ControlConfig,
    telemetry: TelemetryLimits,
}

impl SyncConfig {
    /// Default time between poll ticks.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
    /// Default consecutive poll failures before the device is offline.
    pub const DEFAULT_OFFLINE_THRESHOLD: u32 = 3;
    /// Default minimum spacing between two commands.
    pub const DEFAULT_COMMAND_INTERVAL: Duration = Duration::from_secs(15);
    /// Default bounded wait of operator commands for the command slot.
    pub const DEFAULT_OPERATOR_WAIT: Duration = Duration::from_secs(30);

    /// Sets the time between poll ticks.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets how many consecutive poll failures mark the device offline.
    #[must_use]
    pub fn with_offline_threshold(mut self, threshold: u32) -> Self {
        self.offline_threshold = threshold;
        self
    }

    /// Sets the minimum spacing between two commands.
    ///
    /// The same interval rate-limits control-loop adjustments.
    #[must_use]
    pub fn with_command_interval(mut self, interval: Duration) -> Self {
        self.command_interval = interval;
        self
    }

    /// Sets how long operator commands wait for the command slot.
    #[must_use]
    pub fn with_operator_wait(mut self, wait: Duration) -> Self {
        self.operator_wait = wait;
        self
    }

    /// Sets the transport retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the control loop tuning.
    #[must_use]
    pub fn with_control(mut self, control: ControlConfig) -> Self {
        self.control = control;
        self
    }

    /// Sets the telemetry plausibility bounds.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: TelemetryLimits) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Returns the time between poll ticks.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the offline failure threshold.
    #[must_use]
    pub fn offline_threshold(&self) -> u32 {
        self.offline_threshold
    }

    /// Returns the minimum spacing between two commands.
    #[must_use]
    pub fn command_interval(&self) -> Duration {
        self.command_interval
    }

    /// Returns the operator command wait budget.
    #[must_use]
    pub fn operator_wait(&self) -> Duration {
        self.operator_wait
    }

    /// Returns the transport retry policy.
    #[must_use]
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Returns the control loop tuning.
    #[must_use]
    pub fn control(&self) -> &ControlConfig {
        &self.control
    }

    /// Returns the telemetry plausibility bounds.
    #[must_use]
    pub fn telemetry(&self) -> &TelemetryLimits {
        &self.telemetry
    }

    /// Checks the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns the first `ValueError` found.
    pub fn validate(&self) -> Result<(), ValueError> {
        if self.poll_interval.is_zero() {
            return Err(ValueError::Invalid {
                field: "poll_interval",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.offline_threshold == 0 {
            return Err(ValueError::Invalid {
                field: "offline_threshold",
                reason: "must be at least 1".to_string(),
            });
        }
        self.retry.validate()?;
        self.control.validate()?;
        self.telemetry.validate()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            offline_threshold: Self::DEFAULT_OFFLINE_THRESHOLD,
            command_interval: Self::DEFAULT_COMMAND_INTERVAL,
            operator_wait: Self::DEFAULT_OPERATOR_WAIT,
            retry: RetryPolicy::default(),
            control: ControlConfig::default(),
            telemetry: TelemetryLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.offline_threshold(), 3);
        assert_eq!(config.command_interval(), Duration::from_secs(15));
        assert!((config.control().step_limit_watts() - 100.0).abs() < f64::EPSILON);
        assert!((config.control().settle_tolerance_watts() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_poll_interval_is_invalid() {
        let config = SyncConfig::default().with_poll_interval(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ValueError::Invalid {
                field: "poll_interval",
                ..
            })
        ));
    }

    #[test]
    fn inverted_power_bounds_are_invalid() {
        let control = ControlConfig::default().with_power_bounds(3000.0, 1000.0);
        assert!(matches!(
            control.validate(),
            Err(ValueError::OutOfRange {
                field: "max_power_watts",
                ..
            })
        ));
    }

    #[test]
    fn inverted_board_bounds_are_invalid() {
        let control = ControlConfig::default().with_board_power_bounds(1300.0, 350.0);
        assert!(matches!(
            control.validate(),
            Err(ValueError::OutOfRange {
                field: "board_max_watts",
                ..
            })
        ));
        let control = ControlConfig::default().with_board_power_bounds(0.0, 0.0);
        assert!(control.validate().is_err());
    }

    #[test]
    fn gain_must_be_in_unit_interval() {
        assert!(ControlConfig::default().with_gain(0.0).validate().is_err());
        assert!(ControlConfig::default().with_gain(1.5).validate().is_err());
        assert!(ControlConfig::default().with_gain(1.0).validate().is_ok());
    }

    #[test]
    fn zero_step_limit_is_invalid() {
        let control = ControlConfig::default().with_step_limit_watts(0.0);
        assert!(control.validate().is_err());
    }

    #[test]
    fn nested_errors_surface_from_sync_config() {
        let config = SyncConfig::default()
            .with_telemetry(TelemetryLimits::default().with_board_temp_range(100.0, 0.0));
        assert!(config.validate().is_err());
    }
}
