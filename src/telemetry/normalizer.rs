// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw responses to canonical snapshots.

use chrono::Utc;
use serde_json::Value;

use super::RawTelemetry;
use super::sections::{
    AtmEntry, ConfigEntry, DevDetailEntry, DevEntry, FanEntry, PoolEntry, PowerEntry,
    ProfileEntry, SummaryEntry, TempCtrlEntry, TempEntry, VersionEntry,
};
use super::shares::ShareTracker;
use crate::command::QueryCommand;
use crate::config::TelemetryLimits;
use crate::error::NormalizeError;
use crate::state::{DeviceSnapshot, FieldIssue, IssueKind};
use crate::types::{Hashrate, ProfileInfo, ShareCounters, SleepState};

/// Turns poll-round responses into [`DeviceSnapshot`]s.
///
/// The normalizer remembers the snapshot it produced last and uses it to
/// fill fields the device did not report this round. It only fails when the
/// device identity cannot be established or the version section is
/// structurally unparsable; every other section degrades field by field.
#[derive(Debug)]
pub struct Normalizer {
    limits: TelemetryLimits,
    previous: Option<DeviceSnapshot>,
    shares: ShareTracker,
}

impl Normalizer {
    /// Creates a normalizer with no history.
    #[must_use]
    pub fn new(limits: TelemetryLimits) -> Self {
        Self {
            limits,
            previous: None,
            shares: ShareTracker::default(),
        }
    }

    /// Returns the last snapshot produced.
    #[must_use]
    pub fn previous(&self) -> Option<&DeviceSnapshot> {
        self.previous.as_ref()
    }

    /// Normalizes one poll round.
    ///
    /// A successful call becomes the history for the next one, so only call
    /// this for rounds whose snapshot will be published.
    ///
    /// # Errors
    ///
    /// - `NormalizeError::Malformed` if the `VERSION` section is not an array
    ///   of objects
    /// - `NormalizeError::InvalidIdentity` if the firmware version is present
    ///   but empty or not a string
    /// - `NormalizeError::MissingIdentity` if the version is absent and no
    ///   earlier snapshot provides it
    pub fn normalize(&mut self, raw: &RawTelemetry) -> Result<DeviceSnapshot, NormalizeError> {
        let version = raw
            .section::<VersionEntry>(QueryCommand::Version)?
            .and_then(|entries| entries.into_iter().next());
        let firmware_version = self.identity(version.as_ref())?;

        let summary = raw
            .first::<SummaryEntry>(QueryCommand::Summary)
            .unwrap_or_default();
        let power = raw.first::<PowerEntry>(QueryCommand::Power);
        let temps = raw.entries::<TempEntry>(QueryCommand::Temps);
        let fans = raw.entries::<FanEntry>(QueryCommand::Fans);
        let pools = raw.entries::<PoolEntry>(QueryCommand::Pools);
        let profiles = raw.entries::<ProfileEntry>(QueryCommand::Profiles);
        let atm = raw.first::<AtmEntry>(QueryCommand::Atm);
        let config = raw
            .first::<ConfigEntry>(QueryCommand::Config)
            .unwrap_or_default();
        let devs = raw.entries::<DevEntry>(QueryCommand::Devs);
        let devdetails = raw.entries::<DevDetailEntry>(QueryCommand::DevDetails);
        let tempctrl = raw.first::<TempCtrlEntry>(QueryCommand::TempCtrl);

        let mut f = Fields::new(self.previous.as_ref());

        let hashrate = Hashrate {
            five_sec: f.hashrate("hashrate.five_sec", summary.ghs_5s, |h| h.five_sec),
            one_min: f.hashrate("hashrate.one_min", summary.ghs_1m, |h| h.one_min),
            fifteen_min: f.hashrate("hashrate.fifteen_min", summary.ghs_15m, |h| h.fifteen_min),
            thirty_min: f.hashrate("hashrate.thirty_min", summary.ghs_30m, |h| h.thirty_min),
            average: f.hashrate("hashrate.average", summary.ghs_av, |h| h.average),
        };

        let power_watts = f.resolve(
            "power_watts",
            power.and_then(|p| p.watts),
            |p| p.power_watts,
            0.0,
        );
        let power_watts = f.clamp("power_watts", power_watts, 0.0, f64::MAX);

        let board_temp_max = f.resolve(
            "board_temp_max",
            temps.as_deref().and_then(max_temperature).map(Some),
            |p| p.board_temp_max,
            None,
        );
        let board_temp_max = board_temp_max.map(|t| {
            f.clamp(
                "board_temp_max",
                t,
                self.limits.min_board_temp(),
                self.limits.max_board_temp(),
            )
        });

        let fan_speed_avg_pct = f
            .resolve(
                "fan_speed_avg_pct",
                fans.as_deref().and_then(|x| average(x.iter().filter_map(|e| e.speed))).map(Some),
                |p| p.fan_speed_avg_pct,
                None,
            )
            .map(|pct| f.clamp("fan_speed_avg_pct", pct, 0.0, 100.0));
        let fan_rpm_avg = f
            .resolve(
                "fan_rpm_avg",
                fans.as_deref().and_then(|x| average(x.iter().filter_map(|e| e.rpm))).map(Some),
                |p| p.fan_rpm_avg,
                None,
            )
            .map(|rpm| f.clamp("fan_rpm_avg", rpm, 0.0, f64::MAX));
        let temp_target = f
            .resolve(
                "temp_target",
                tempctrl.and_then(|t| t.target).map(Some),
                |p| p.temp_target,
                None,
            )
            .map(|t| {
                f.clamp(
                    "temp_target",
                    t,
                    self.limits.min_board_temp(),
                    self.limits.max_board_temp(),
                )
            });

        let shares = ShareCounters {
            accepted: f.resolve("shares.accepted", summary.accepted, |p| p.shares.accepted, 0),
            rejected: f.resolve("shares.rejected", summary.rejected, |p| p.shares.rejected, 0),
            stale: f.resolve("shares.stale", summary.stale, |p| p.shares.stale, 0),
        };
        let fresh_shares =
            summary.accepted.is_some() && summary.rejected.is_some() && summary.stale.is_some();
        let (share_delta, restart_detected) = if fresh_shares {
            let observation = self.shares.observe(shares);
            (observation.delta, observation.reset)
        } else {
            (None, false)
        };

        let pool = pools.as_deref().map(active_pool);
        let pool_connected = f.resolve(
            "pool_connected",
            pool.as_ref().map(|p| p.connected),
            |p| p.pool_connected,
            false,
        );
        let active_pool_url = f.resolve(
            "active_pool_url",
            pool.as_ref().map(|p| p.url.clone()),
            |p| p.active_pool_url.clone(),
            String::new(),
        );
        let active_pool_user = f.resolve(
            "active_pool_user",
            pool.as_ref().map(|p| p.user.clone()),
            |p| p.active_pool_user.clone(),
            None,
        );
        let active_pool_difficulty = f.resolve(
            "active_pool_difficulty",
            pool.as_ref().map(|p| p.difficulty),
            |p| p.active_pool_difficulty,
            None,
        );

        let available_profiles = f.resolve(
            "available_profiles",
            profiles.map(|entries| entries.into_iter().filter_map(profile_info).collect()),
            |p| p.available_profiles.clone(),
            Vec::new(),
        );

        let snapshot = DeviceSnapshot {
            captured_at: Utc::now(),
            model: f.resolve(
                "model",
                version
                    .as_ref()
                    .and_then(|v| v.model.clone())
                    .or(config.model)
                    .map(Some),
                |p| p.model.clone(),
                None,
            ),
            hostname: f.resolve(
                "hostname",
                config.hostname.map(Some),
                |p| p.hostname.clone(),
                None,
            ),
            firmware_version,
            efficiency_w_per_th: efficiency(power_watts, hashrate.five_sec),
            hashrate,
            power_watts,
            board_temp_max,
            fan_speed_avg_pct,
            fan_rpm_avg,
            temp_target,
            shares,
            share_delta,
            restart_detected,
            hardware_errors: f.resolve(
                "hardware_errors",
                summary.hardware_errors,
                |p| p.hardware_errors,
                0,
            ),
            uptime_secs: f.resolve("uptime_secs", summary.elapsed, |p| p.uptime_secs, 0),
            pool_connected,
            active_pool_url,
            active_pool_user,
            active_pool_difficulty,
            profile_name: f.resolve(
                "profile_name",
                config.profile.map(Some),
                |p| p.profile_name.clone(),
                None,
            ),
            available_profiles,
            atm_enabled: f.resolve(
                "atm_enabled",
                atm.and_then(|a| a.enabled),
                |p| p.atm_enabled,
                false,
            ),
            is_tuning: f.resolve("is_tuning", config.is_tuning, |p| p.is_tuning, false),
            sleep_state: f.resolve(
                "sleep_state",
                config
                    .curtail_mode
                    .as_deref()
                    .map(SleepState::from_curtail_mode),
                |p| p.sleep_state,
                SleepState::Awake,
            ),
            online: true,
            board_count: f.resolve(
                "board_count",
                devs.map(|d| u32::try_from(d.len()).unwrap_or(u32::MAX)),
                |p| p.board_count,
                0,
            ),
            chip_count: f.resolve(
                "chip_count",
                devdetails.map(|d| saturating_u32(d.iter().filter_map(|e| e.chips).sum())),
                |p| p.chip_count,
                0,
            ),
            issues: f.into_issues(),
        };

        self.previous = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn identity(&mut self, version: Option<&VersionEntry>) -> Result<String, NormalizeError> {
        match version.and_then(|v| v.luxminer.as_ref()) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(other) => Err(NormalizeError::InvalidIdentity(format!(
                "LUXminer = {other}"
            ))),
            None => self
                .previous
                .as_ref()
                .map(|p| p.firmware_version.clone())
                .ok_or(NormalizeError::MissingIdentity),
        }
    }
}

/// Resolves fields against the previous snapshot and records issues.
struct Fields<'a> {
    previous: Option<&'a DeviceSnapshot>,
    issues: Vec<FieldIssue>,
}

impl<'a> Fields<'a> {
    fn new(previous: Option<&'a DeviceSnapshot>) -> Self {
        Self {
            previous,
            issues: Vec::new(),
        }
    }

    fn resolve<T>(
        &mut self,
        field: &'static str,
        fresh: Option<T>,
        last: impl FnOnce(&DeviceSnapshot) -> T,
        default: T,
    ) -> T {
        if let Some(value) = fresh {
            return value;
        }
        match self.previous {
            // A value that was defaulted stays defaulted when carried over.
            Some(prev) if prev.has_issue(field, IssueKind::Defaulted) => {
                self.flag(field, IssueKind::Defaulted);
                last(prev)
            }
            Some(prev) => {
                self.flag(field, IssueKind::Substituted);
                last(prev)
            }
            None => {
                self.flag(field, IssueKind::Defaulted);
                default
            }
        }
    }

    fn hashrate(
        &mut self,
        field: &'static str,
        ghs: Option<f64>,
        last: impl FnOnce(&Hashrate) -> f64,
    ) -> f64 {
        let ths = self.resolve(
            field,
            ghs.map(Hashrate::ths_from_ghs),
            |p| last(&p.hashrate),
            0.0,
        );
        self.clamp(field, ths, 0.0, f64::MAX)
    }

    fn clamp(&mut self, field: &'static str, value: f64, min: f64, max: f64) -> f64 {
        if value < min || value > max {
            tracing::warn!(field, value, min, max, "Clamping out-of-range telemetry value");
            self.flag(field, IssueKind::Clamped);
        }
        value.clamp(min, max)
    }

    fn flag(&mut self, field: &'static str, kind: IssueKind) {
        self.issues.push(FieldIssue { field, kind });
    }

    fn into_issues(self) -> Vec<FieldIssue> {
        self.issues
    }
}

struct PoolState {
    connected: bool,
    url: String,
    user: Option<String>,
    difficulty: Option<f64>,
}

/// First alive pool with an active stratum connection, else the first pool.
fn active_pool(pools: &[PoolEntry]) -> PoolState {
    let active = pools
        .iter()
        .find(|p| p.is_active())
        .or_else(|| pools.first());
    match active {
        Some(pool) => {
            let connected = pool.is_alive();
            PoolState {
                connected,
                url: if connected {
                    pool.address().unwrap_or_default().to_string()
                } else {
                    String::new()
                },
                user: pool.user.clone(),
                difficulty: pool.difficulty,
            }
        }
        None => PoolState {
            connected: false,
            url: String::new(),
            user: None,
            difficulty: None,
        },
    }
}

fn max_temperature(boards: &[TempEntry]) -> Option<f64> {
    boards
        .iter()
        .flat_map(TempEntry::readings)
        .reduce(f64::max)
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| (sum / f64::from(count)).round())
}

fn efficiency(power_watts: f64, hashrate_ths: f64) -> Option<f64> {
    (power_watts > 0.0 && hashrate_ths > 0.0)
        .then(|| (power_watts / hashrate_ths * 100.0).round() / 100.0)
}

fn profile_info(entry: ProfileEntry) -> Option<ProfileInfo> {
    Some(ProfileInfo {
        name: entry.name?,
        watts: entry.watts,
        hashrate_ths: entry.hashrate,
    })
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::command::Command;
    use crate::protocol::RawResponse;
    use crate::protocol::mock::fixtures;

    fn healthy_round(power_watts: f64) -> RawTelemetry {
        let mut raw = RawTelemetry::new();
        for query in QueryCommand::POLL_ROUND {
            let body = fixtures::healthy(power_watts)
                .into_iter()
                .find(|(name, _)| *name == query_name(query))
                .map(|(_, body)| body)
                .unwrap();
            raw.insert(query, RawResponse::from_value(query_name(query), body).unwrap());
        }
        raw
    }

    fn query_name(query: QueryCommand) -> &'static str {
        query.name()
    }

    fn replace(raw: &mut RawTelemetry, query: QueryCommand, body: Value) {
        raw.insert(query, RawResponse::from_value(query_name(query), body).unwrap());
    }

    #[test]
    fn healthy_round_normalizes_every_field() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        let snapshot = normalizer.normalize(&healthy_round(3000.0)).unwrap();

        assert_eq!(snapshot.firmware_version, "2024.5.1.155013-f2b6d0c0");
        assert_eq!(snapshot.model.as_deref(), Some("Antminer S19j Pro"));
        assert_eq!(snapshot.hostname.as_deref(), Some("miner-01"));
        assert!((snapshot.hashrate.five_sec - 100.0).abs() < 1e-9);
        assert!((snapshot.hashrate.average - 99.7).abs() < 1e-9);
        assert!((snapshot.power_watts - 3000.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.efficiency_w_per_th, Some(30.0));
        assert_eq!(snapshot.board_temp_max, Some(72.5));
        assert_eq!(snapshot.fan_speed_avg_pct, Some(60.0));
        assert_eq!(snapshot.fan_rpm_avg, Some(4250.0));
        assert_eq!(snapshot.shares.accepted, 1200);
        assert_eq!(snapshot.hardware_errors, 12);
        assert_eq!(snapshot.uptime_secs, 86_400);
        assert!(snapshot.pool_connected);
        assert_eq!(snapshot.active_pool_url, "pool.example.com");
        assert_eq!(snapshot.active_pool_user.as_deref(), Some("acct.worker1"));
        assert_eq!(snapshot.profile_name.as_deref(), Some("default"));
        assert_eq!(snapshot.available_profiles.len(), 3);
        assert!(snapshot.atm_enabled);
        assert!(!snapshot.is_tuning);
        assert_eq!(snapshot.sleep_state, SleepState::Awake);
        assert_eq!(snapshot.board_count, 3);
        assert_eq!(snapshot.chip_count, 378);
        assert_eq!(snapshot.temp_target, Some(75.0));
        assert!(snapshot.online);
        assert!(snapshot.issues.is_empty(), "{:?}", snapshot.issues);
    }

    #[test]
    fn missing_fan_rpm_keeps_previous_value_only() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        let first = normalizer.normalize(&healthy_round(3000.0)).unwrap();

        let mut raw = healthy_round(3000.0);
        replace(&mut raw, QueryCommand::Fans, fixtures::fans_without_rpm());
        let second = normalizer.normalize(&raw).unwrap();

        assert_eq!(second.fan_rpm_avg, first.fan_rpm_avg);
        assert_eq!(
            second.issues,
            vec![FieldIssue {
                field: "fan_rpm_avg",
                kind: IssueKind::Substituted
            }]
        );

        let comparable = DeviceSnapshot {
            captured_at: first.captured_at,
            share_delta: first.share_delta,
            issues: first.issues.clone(),
            ..second
        };
        assert_eq!(comparable, first);
    }

    #[test]
    fn missing_counters_are_never_zeroed() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        normalizer.normalize(&healthy_round(3000.0)).unwrap();

        let mut raw = healthy_round(3000.0);
        replace(&mut raw, QueryCommand::Summary, json!({"SUMMARY": [{"GHS 5s": 99_000.0}]}));
        let snapshot = normalizer.normalize(&raw).unwrap();

        assert_eq!(snapshot.shares.accepted, 1200);
        assert_eq!(snapshot.shares.rejected, 3);
        assert_eq!(snapshot.hardware_errors, 12);
        assert!(snapshot.has_issue("shares.accepted", IssueKind::Substituted));
        assert!(snapshot.share_delta.is_none());
        assert!(!snapshot.restart_detected);
    }

    #[test]
    fn decreasing_counters_flag_restart_without_negative_delta() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        normalizer.normalize(&healthy_round(3000.0)).unwrap();

        let mut raw = healthy_round(3000.0);
        replace(&mut raw, QueryCommand::Summary, fixtures::summary(1300, 4, 1));
        let grown = normalizer.normalize(&raw).unwrap();
        assert_eq!(
            grown.share_delta,
            Some(ShareCounters {
                accepted: 100,
                rejected: 1,
                stale: 0
            })
        );

        replace(&mut raw, QueryCommand::Summary, fixtures::summary(2, 0, 0));
        let restarted = normalizer.normalize(&raw).unwrap();
        assert!(restarted.restart_detected);
        assert!(restarted.share_delta.is_none());
        assert_eq!(restarted.shares.accepted, 2);
    }

    #[test]
    fn out_of_range_values_are_clamped_and_flagged() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        let mut raw = healthy_round(3000.0);
        replace(
            &mut raw,
            QueryCommand::Temps,
            json!({"TEMPS": [{"Board": 60, "Chip": 512}]}),
        );
        replace(
            &mut raw,
            QueryCommand::Fans,
            json!({"FANS": [{"Speed": 140, "RPM": 4000}]}),
        );
        replace(&mut raw, QueryCommand::Power, json!({"POWER": [{"Watts": -20}]}));

        let snapshot = normalizer.normalize(&raw).unwrap();
        assert_eq!(snapshot.board_temp_max, Some(150.0));
        assert_eq!(snapshot.fan_speed_avg_pct, Some(100.0));
        assert!(snapshot.power_watts.abs() < f64::EPSILON);
        assert_eq!(snapshot.efficiency_w_per_th, None);
        assert!(snapshot.has_issue("board_temp_max", IssueKind::Clamped));
        assert!(snapshot.has_issue("fan_speed_avg_pct", IssueKind::Clamped));
        assert!(snapshot.has_issue("power_watts", IssueKind::Clamped));
    }

    #[test]
    fn missing_fields_without_history_are_defaulted() {
        let mut raw = RawTelemetry::new();
        replace(&mut raw, QueryCommand::Version, fixtures::version());

        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        let snapshot = normalizer.normalize(&raw).unwrap();
        assert!(snapshot.power_watts.abs() < f64::EPSILON);
        assert!(!snapshot.power_is_measured());
        assert!(snapshot.has_issue("shares.accepted", IssueKind::Defaulted));

        // Still not measured when carried over.
        let snapshot = normalizer.normalize(&raw).unwrap();
        assert!(!snapshot.power_is_measured());
    }

    #[test]
    fn identity_rules() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());

        let mut raw = RawTelemetry::new();
        assert!(matches!(
            normalizer.normalize(&raw),
            Err(NormalizeError::MissingIdentity)
        ));

        replace(&mut raw, QueryCommand::Version, json!({"VERSION": [{"LUXminer": ""}]}));
        assert!(matches!(
            normalizer.normalize(&raw),
            Err(NormalizeError::InvalidIdentity(_))
        ));

        replace(&mut raw, QueryCommand::Version, json!({"VERSION": [{"LUXminer": 7}]}));
        assert!(matches!(
            normalizer.normalize(&raw),
            Err(NormalizeError::InvalidIdentity(_))
        ));

        replace(&mut raw, QueryCommand::Version, json!({"VERSION": "oops"}));
        assert!(matches!(
            normalizer.normalize(&raw),
            Err(NormalizeError::Malformed {
                section: "VERSION",
                ..
            })
        ));

        // Once known, the identity is cached for rounds without a version.
        let full = healthy_round(3000.0);
        normalizer.normalize(&full).unwrap();
        let mut raw = RawTelemetry::new();
        for query in QueryCommand::POLL_ROUND.into_iter().skip(1) {
            raw.insert(query, full.get(query).unwrap().clone());
        }
        let snapshot = normalizer.normalize(&raw).unwrap();
        assert_eq!(snapshot.firmware_version, "2024.5.1.155013-f2b6d0c0");
    }

    #[test]
    fn malformed_section_is_treated_as_absent() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        let first = normalizer.normalize(&healthy_round(3000.0)).unwrap();

        let mut raw = healthy_round(3000.0);
        replace(&mut raw, QueryCommand::Pools, json!({"POOLS": {"not": "a list"}}));
        let snapshot = normalizer.normalize(&raw).unwrap();
        assert_eq!(snapshot.active_pool_url, first.active_pool_url);
        assert!(snapshot.has_issue("active_pool_url", IssueKind::Substituted));
    }

    #[test]
    fn dead_pool_has_empty_url() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        let mut raw = healthy_round(3000.0);
        replace(
            &mut raw,
            QueryCommand::Pools,
            json!({"POOLS": [{"URL": "stratum+tcp://a:1", "Status": "Dead", "Stratum Active": false}]}),
        );
        let snapshot = normalizer.normalize(&raw).unwrap();
        assert!(!snapshot.pool_connected);
        assert_eq!(snapshot.active_pool_url, "");
    }

    #[test]
    fn temperature_target_is_carried_and_clamped() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        normalizer.normalize(&healthy_round(3000.0)).unwrap();

        let mut raw = healthy_round(3000.0);
        replace(&mut raw, QueryCommand::TempCtrl, json!({"TEMPCTRL": [{"Mode": "Auto"}]}));
        let carried = normalizer.normalize(&raw).unwrap();
        assert_eq!(carried.temp_target, Some(75.0));
        assert!(carried.has_issue("temp_target", IssueKind::Substituted));

        replace(&mut raw, QueryCommand::TempCtrl, json!({"TEMPCTRL": [{"Target": "400"}]}));
        let clamped = normalizer.normalize(&raw).unwrap();
        assert_eq!(clamped.temp_target, Some(150.0));
        assert!(clamped.has_issue("temp_target", IssueKind::Clamped));
    }

    #[test]
    fn rejected_power_query_is_not_a_measurement() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        normalizer.normalize(&healthy_round(2000.0)).unwrap();

        let full = healthy_round(2100.0);
        let mut raw = RawTelemetry::new();
        for query in QueryCommand::POLL_ROUND {
            if query != QueryCommand::Power {
                raw.insert(query, full.get(query).unwrap().clone());
            }
        }
        let snapshot = normalizer.normalize(&raw).unwrap();
        assert!((snapshot.power_watts - 2000.0).abs() < f64::EPSILON);
        assert!(snapshot.has_issue("power_watts", IssueKind::Substituted));
        assert!(!snapshot.power_is_measured());
    }

    #[test]
    fn curtail_mode_sets_sleep_state() {
        let mut normalizer = Normalizer::new(TelemetryLimits::default());
        let mut raw = healthy_round(3000.0);
        replace(&mut raw, QueryCommand::Config, fixtures::config("default", "Sleep"));
        let snapshot = normalizer.normalize(&raw).unwrap();
        assert_eq!(snapshot.sleep_state, SleepState::Sleeping);
    }
}
