// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded-step proportional power controller.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::ControlTarget;
use crate::config::ControlConfig;
use crate::state::DeviceSnapshot;

/// Controller state machine mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ControllerMode {
    /// No target set.
    #[default]
    Idle,
    /// Measured power is outside the dead-band; adjusting.
    Converging,
    /// Within the dead-band, or as close as the device allows.
    Settled,
    /// Control paused; see [`SuspendReason`].
    Suspended,
}

/// Why the controller is suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SuspendReason {
    /// The device is offline.
    Offline,
    /// The device is sleeping, waking, or an operator put it to sleep.
    NotAwake,
    /// Too many consecutive command failures; cleared by setting a target.
    CommandFailures,
}

impl fmt::Display for SuspendReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offline => "device offline",
            Self::NotAwake => "device not awake",
            Self::CommandFailures => "repeated command failures",
        })
    }
}

/// Why an evaluation issued nothing although the device is off target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A command is in flight.
    GatewayBusy,
    /// The minimum interval since the last command has not elapsed.
    Interval {
        /// Time left until the next command may be issued.
        remaining: Duration,
    },
    /// The snapshot carries no measured power reading yet.
    NoMeasurement,
}

/// Outcome of one controller evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// No target: control disabled.
    Disabled,
    /// Off target, but no command this cycle.
    Skip(SkipReason),
    /// Within tolerance or converged as close as possible.
    Settled,
    /// Control suspended.
    Suspended(SuspendReason),
    /// Issue a new power limit.
    Issue {
        /// Power limit to set.
        watts: u32,
        /// `target - measured` at decision time.
        error_watts: f64,
    },
}

/// Read-only view of the controller for observers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerStatus {
    /// Current mode.
    pub mode: ControllerMode,
    /// Why the controller is suspended, when it is.
    pub suspend_reason: Option<SuspendReason>,
    /// Active target, if any.
    pub target_watts: Option<f64>,
    /// Last power limit issued successfully.
    pub last_command_watts: Option<u32>,
    /// Last computed `target - measured`.
    pub last_error_watts: Option<f64>,
    /// Consecutive failed commands.
    pub consecutive_failures: u32,
}

/// The power control loop's decision logic.
///
/// The controller does no I/O: it is evaluated once per fresh snapshot and
/// told afterwards whether the command it asked for was issued or failed.
/// Each evaluation:
///
/// 1. suspends while the device is offline or not awake
/// 2. settles when `|target - measured| <= settle_tolerance`
/// 3. skips while the gateway is busy or the minimum interval since the last
///    command has not elapsed
/// 4. otherwise proposes `measured + clamp(gain * error, ±step_limit)`,
///    clamped to the target's safety bounds for the reported board count
/// 5. settles instead when that proposal has not moved by at least
///    `min_change_watts` for more than `no_progress_cap` commands
#[derive(Debug)]
pub struct PowerController {
    config: ControlConfig,
    min_interval: Duration,
    target: Option<ControlTarget>,
    mode: ControllerMode,
    suspend_reason: Option<SuspendReason>,
    sleep_requested: bool,
    last_command_watts: Option<u32>,
    last_command_time: Option<Instant>,
    last_error_watts: Option<f64>,
    no_progress: u32,
    consecutive_failures: u32,
}

impl PowerController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(config: ControlConfig, min_interval: Duration) -> Self {
        Self {
            config,
            min_interval,
            target: None,
            mode: ControllerMode::Idle,
            suspend_reason: None,
            sleep_requested: false,
            last_command_watts: None,
            last_command_time: None,
            last_error_watts: None,
            no_progress: 0,
            consecutive_failures: 0,
        }
    }

    /// Returns the tuning this controller was built with.
    #[must_use]
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Returns the current mode.
    #[must_use]
    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    /// Returns why the controller is suspended, if it is.
    #[must_use]
    pub fn suspend_reason(&self) -> Option<SuspendReason> {
        self.suspend_reason
    }

    /// Returns the active target.
    #[must_use]
    pub fn target(&self) -> Option<&ControlTarget> {
        self.target.as_ref()
    }

    /// Returns a snapshot of the controller state.
    #[must_use]
    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            mode: self.mode,
            suspend_reason: self.suspend_reason,
            target_watts: self.target.map(|t| t.target_power_watts()),
            last_command_watts: self.last_command_watts,
            last_error_watts: self.last_error_watts,
            consecutive_failures: self.consecutive_failures,
        }
    }

    /// Sets or clears the target.
    ///
    /// Clearing returns the controller to `Idle`. Setting a target starts a
    /// new convergence and clears a command-failure suspension.
    pub fn set_target(&mut self, target: Option<ControlTarget>) {
        self.target = target;
        self.reset_history();
        match target {
            None => {
                self.suspend_reason = None;
                self.consecutive_failures = 0;
                self.transition(ControllerMode::Idle);
            }
            Some(t) => {
                if self.suspend_reason == Some(SuspendReason::CommandFailures) {
                    self.suspend_reason = None;
                    self.consecutive_failures = 0;
                }
                tracing::info!(target_watts = t.target_power_watts(), "Power target set");
                if self.suspend_reason.is_none() {
                    self.transition(ControllerMode::Converging);
                }
            }
        }
    }

    /// Records an operator sleep (`true`) or wake (`false`) request.
    ///
    /// While a sleep is requested the controller stays suspended even if the
    /// device still reports itself awake.
    pub fn set_sleep_requested(&mut self, requested: bool) {
        self.sleep_requested = requested;
    }

    /// Evaluates one fresh snapshot.
    pub fn evaluate(
        &mut self,
        snapshot: &DeviceSnapshot,
        now: Instant,
        gateway_busy: bool,
    ) -> Decision {
        let Some(target) = self.target else {
            self.transition(ControllerMode::Idle);
            return Decision::Disabled;
        };

        if self.suspend_reason == Some(SuspendReason::CommandFailures) {
            return Decision::Suspended(SuspendReason::CommandFailures);
        }
        if !snapshot.online {
            self.reset_history();
            return self.suspend(SuspendReason::Offline);
        }
        if self.sleep_requested || !snapshot.sleep_state.is_awake() {
            return self.suspend(SuspendReason::NotAwake);
        }
        if !snapshot.power_is_measured() {
            return Decision::Skip(SkipReason::NoMeasurement);
        }
        self.suspend_reason = None;

        let measured = snapshot.power_watts;
        let error = target.target_power_watts() - measured;
        self.last_error_watts = Some(error);

        if error.abs() <= target.settle_tolerance_watts() {
            self.no_progress = 0;
            self.transition(ControllerMode::Settled);
            return Decision::Settled;
        }
        if self.mode != ControllerMode::Settled || self.no_progress == 0 {
            self.transition(ControllerMode::Converging);
        }

        if gateway_busy {
            return Decision::Skip(SkipReason::GatewayBusy);
        }
        if let Some(last) = self.last_command_time {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                return Decision::Skip(SkipReason::Interval {
                    remaining: self.min_interval - elapsed,
                });
            }
        }

        let step = (self.config.gain() * error)
            .clamp(-target.step_limit_watts(), target.step_limit_watts());
        let (min_watts, max_watts) = target.bounds_for(snapshot.board_count);
        let watts = to_watts((measured + step).clamp(min_watts, max_watts));

        let negligible = self
            .last_command_watts
            .is_some_and(|last| (f64::from(watts) - f64::from(last)).abs() < self.config.min_change_watts());
        if negligible && self.no_progress >= self.config.no_progress_cap() {
            tracing::info!(
                measured,
                target = target.target_power_watts(),
                "No further progress possible, settling"
            );
            self.transition(ControllerMode::Settled);
            return Decision::Settled;
        }

        Decision::Issue {
            watts,
            error_watts: error,
        }
    }

    /// Records that the command from the last [`Decision::Issue`] was issued.
    pub fn record_issued(&mut self, watts: u32, at: Instant) {
        let progressed = self.last_command_watts.is_none_or(|last| {
            (f64::from(watts) - f64::from(last)).abs() >= self.config.min_change_watts()
        });
        if progressed {
            self.no_progress = 0;
        } else {
            self.no_progress += 1;
        }
        self.last_command_watts = Some(watts);
        self.last_command_time = Some(at);
        self.consecutive_failures = 0;
    }

    /// Records a failed or rejected command.
    ///
    /// Returns `Some(SuspendReason::CommandFailures)` exactly once: when the
    /// failure limit is reached.
    pub fn record_failure(&mut self) -> Option<SuspendReason> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures == self.config.failure_limit() {
            tracing::error!(
                failures = self.consecutive_failures,
                "Power control suspended after repeated command failures"
            );
            self.suspend_reason = Some(SuspendReason::CommandFailures);
            self.transition(ControllerMode::Suspended);
            Some(SuspendReason::CommandFailures)
        } else {
            None
        }
    }

    fn suspend(&mut self, reason: SuspendReason) -> Decision {
        if self.suspend_reason != Some(reason) {
            tracing::info!(%reason, "Power control suspended");
        }
        self.suspend_reason = Some(reason);
        self.transition(ControllerMode::Suspended);
        Decision::Suspended(reason)
    }

    fn reset_history(&mut self) {
        self.last_command_watts = None;
        self.last_error_watts = None;
        self.no_progress = 0;
    }

    fn transition(&mut self, mode: ControllerMode) {
        if self.mode != mode {
            tracing::info!(from = ?self.mode, to = ?mode, "Controller mode changed");
            self.mode = mode;
        }
    }
}

/// Rounds a clamped, non-negative power limit to whole watts.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_watts(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::snapshot::sample_snapshot;
    use crate::state::{FieldIssue, IssueKind};
    use crate::types::SleepState;

    const INTERVAL: Duration = Duration::from_secs(15);

    fn controller(target_watts: f64) -> PowerController {
        let config = ControlConfig::default();
        let mut c = PowerController::new(config, INTERVAL);
        c.set_target(Some(ControlTarget::new(target_watts, &config).unwrap()));
        c
    }

    /// Feeds measurements one interval apart, recording every issued command.
    fn run(c: &mut PowerController, measurements: &[f64]) -> (Vec<u32>, Decision) {
        let start = Instant::now();
        let mut issued = Vec::new();
        let mut last = Decision::Disabled;
        for (i, &measured) in measurements.iter().enumerate() {
            let now = start + INTERVAL * u32::try_from(i).unwrap();
            last = c.evaluate(&sample_snapshot(measured), now, false);
            if let Decision::Issue { watts, .. } = last {
                c.record_issued(watts, now);
                issued.push(watts);
            }
        }
        (issued, last)
    }

    #[test]
    fn converges_with_shrinking_steps_and_no_overshoot() {
        let mut c = controller(3000.0);
        let (issued, last) = run(&mut c, &[2500.0, 2620.0, 2710.0, 2790.0, 2850.0, 2910.0, 2960.0]);

        assert_eq!(issued, vec![2600, 2720, 2810, 2890, 2925, 2955]);
        assert_eq!(last, Decision::Settled);
        assert_eq!(c.mode(), ControllerMode::Settled);

        let steps: Vec<u32> = issued.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(steps.windows(2).all(|w| w[1] <= w[0]), "{steps:?}");
        assert!(issued.iter().all(|&w| f64::from(w) <= 3000.0 + 50.0));
    }

    #[test]
    fn never_issues_within_the_minimum_interval() {
        let mut c = controller(3000.0);
        let start = Instant::now();
        let mut last_issue: Option<Instant> = None;
        for step in 0..40u32 {
            let now = start + Duration::from_secs(4) * step;
            if let Decision::Issue { watts, .. } = c.evaluate(&sample_snapshot(2000.0), now, false) {
                if let Some(prev) = last_issue {
                    assert!(now - prev >= INTERVAL);
                }
                c.record_issued(watts, now);
                last_issue = Some(now);
            }
        }
        assert!(last_issue.is_some());
    }

    #[test]
    fn sleeping_device_gets_no_commands() {
        let mut c = controller(3000.0);
        let mut snapshot = sample_snapshot(1500.0);
        snapshot.sleep_state = SleepState::Sleeping;
        let start = Instant::now();

        for i in 0..5u32 {
            let decision = c.evaluate(&snapshot, start + INTERVAL * i, false);
            assert_eq!(decision, Decision::Suspended(SuspendReason::NotAwake));
        }
        assert_eq!(c.mode(), ControllerMode::Suspended);

        snapshot.sleep_state = SleepState::Awake;
        assert!(matches!(
            c.evaluate(&snapshot, start + INTERVAL * 6, false),
            Decision::Issue { .. }
        ));
        assert_eq!(c.mode(), ControllerMode::Converging);
    }

    #[test]
    fn operator_sleep_suspends_before_device_reports_it() {
        let mut c = controller(3000.0);
        c.set_sleep_requested(true);
        assert_eq!(
            c.evaluate(&sample_snapshot(2000.0), Instant::now(), false),
            Decision::Suspended(SuspendReason::NotAwake)
        );
        c.set_sleep_requested(false);
        assert!(matches!(
            c.evaluate(&sample_snapshot(2000.0), Instant::now(), false),
            Decision::Issue { .. }
        ));
    }

    #[test]
    fn offline_device_suspends_and_resets_history() {
        let mut c = controller(3000.0);
        let now = Instant::now();
        let Decision::Issue { watts, .. } = c.evaluate(&sample_snapshot(2000.0), now, false) else {
            panic!("expected a command");
        };
        c.record_issued(watts, now);

        let offline = sample_snapshot(2000.0).to_offline();
        assert_eq!(
            c.evaluate(&offline, now + INTERVAL, false),
            Decision::Suspended(SuspendReason::Offline)
        );
        assert_eq!(c.status().last_command_watts, None);
    }

    #[test]
    fn busy_gateway_skips() {
        let mut c = controller(3000.0);
        assert_eq!(
            c.evaluate(&sample_snapshot(2000.0), Instant::now(), true),
            Decision::Skip(SkipReason::GatewayBusy)
        );
    }

    #[test]
    fn clamps_to_safety_bounds() {
        let config = ControlConfig::default();
        let mut c = PowerController::new(config, INTERVAL);
        let target = ControlTarget::new(3000.0, &config)
            .unwrap()
            .with_power_bounds(2000.0, 3050.0)
            .with_step_limit_watts(500.0);
        c.set_target(Some(target));

        let decision = c.evaluate(&sample_snapshot(1000.0), Instant::now(), false);
        assert!(matches!(decision, Decision::Issue { watts: 2000, .. }));
    }

    #[test]
    fn single_board_limits_come_from_the_board_count() {
        let config = ControlConfig::default().with_step_limit_watts(1000.0);
        let mut c = PowerController::new(config, INTERVAL);
        c.set_target(Some(ControlTarget::new(3000.0, &config).unwrap()));

        let mut snapshot = sample_snapshot(1200.0);
        snapshot.board_count = 1;
        let decision = c.evaluate(&snapshot, Instant::now(), false);
        assert!(matches!(decision, Decision::Issue { watts: 1300, .. }));

        // Unknown board count falls back to the configured bounds.
        snapshot.board_count = 0;
        let decision = c.evaluate(&snapshot, Instant::now() + INTERVAL, false);
        assert!(matches!(decision, Decision::Issue { watts: 2100, .. }));
    }

    #[test]
    fn substituted_power_is_not_acted_on() {
        let mut c = controller(3000.0);
        let mut snapshot = sample_snapshot(2000.0);
        snapshot.issues.push(FieldIssue {
            field: "power_watts",
            kind: IssueKind::Substituted,
        });
        assert_eq!(
            c.evaluate(&snapshot, Instant::now(), false),
            Decision::Skip(SkipReason::NoMeasurement)
        );
        assert_eq!(c.status().last_command_watts, None);
    }

    #[test]
    fn stuck_adjustments_settle_after_the_cap() {
        // The device keeps drawing 1500 W whatever limit it is given.
        let config = ControlConfig::default();
        let mut c = PowerController::new(config, INTERVAL);
        let target = ControlTarget::new(2000.0, &config)
            .unwrap()
            .with_power_bounds(350.0, 2000.0)
            .with_step_limit_watts(1000.0);
        c.set_target(Some(target));

        let (issued, last) = run(&mut c, &[1500.0; 8]);
        // One real change, then `no_progress_cap` repeats, then settle.
        assert_eq!(issued, vec![1750, 1750, 1750, 1750]);
        assert_eq!(last, Decision::Settled);
    }

    #[test]
    fn three_failures_suspend_exactly_once() {
        let mut c = controller(3000.0);
        assert_eq!(c.record_failure(), None);
        assert_eq!(c.record_failure(), None);
        assert_eq!(c.record_failure(), Some(SuspendReason::CommandFailures));
        assert_eq!(c.mode(), ControllerMode::Suspended);
        assert_eq!(
            c.evaluate(&sample_snapshot(2000.0), Instant::now(), false),
            Decision::Suspended(SuspendReason::CommandFailures)
        );
        assert_eq!(c.record_failure(), None);

        // A new target clears the fault.
        c.set_target(Some(ControlTarget::new(2800.0, c.config()).unwrap()));
        assert_eq!(c.suspend_reason(), None);
        assert!(matches!(
            c.evaluate(&sample_snapshot(2000.0), Instant::now(), false),
            Decision::Issue { .. }
        ));
    }

    #[test]
    fn success_resets_failure_count() {
        let mut c = controller(3000.0);
        c.record_failure();
        c.record_failure();
        c.record_issued(2500, Instant::now());
        assert_eq!(c.record_failure(), None);
        assert_eq!(c.status().consecutive_failures, 1);
    }

    #[test]
    fn clearing_the_target_goes_idle() {
        let mut c = controller(3000.0);
        c.set_target(None);
        assert_eq!(c.mode(), ControllerMode::Idle);
        assert_eq!(
            c.evaluate(&sample_snapshot(2000.0), Instant::now(), false),
            Decision::Disabled
        );
    }
}
