// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted in-memory device used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::command::Command;
use crate::error::TransportError;
use crate::protocol::{RawResponse, Transport};

/// One scripted answer.
#[derive(Debug, Clone)]
pub(crate) enum MockReply {
    Json(Value),
    Timeout,
    Refused,
}

impl MockReply {
    pub(crate) fn json(value: Value) -> Self {
        Self::Json(value)
    }

    pub(crate) fn ok() -> Self {
        Self::Json(json!({"STATUS": [{"STATUS": "S", "Msg": "ok"}]}))
    }

    pub(crate) fn error(message: &str) -> Self {
        Self::Json(json!({"STATUS": [{"STATUS": "E", "Msg": message}]}))
    }
}

/// A recorded call: command name and parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub name: &'static str,
    pub parameter: Option<String>,
}

/// Transport answering from per-command queues, then per-command defaults.
///
/// Commands with neither answer with a refused connection.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    queued: Mutex<HashMap<&'static str, VecDeque<MockReply>>>,
    defaults: Mutex<HashMap<&'static str, MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
    unreachable: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A healthy, awake three-board miner drawing `power_watts`.
    pub(crate) fn miner(power_watts: f64) -> Self {
        let transport = Self::new();
        for (name, body) in fixtures::healthy(power_watts) {
            transport.set_default(name, MockReply::Json(body));
        }
        transport.set_default("session", MockReply::Json(fixtures::session("")));
        transport.set_default("logon", MockReply::Json(fixtures::session("sess-1")));
        for name in [
            "logoff",
            "powertargetset",
            "profileset",
            "atmset",
            "curtail",
            "rebootdevice",
            "resetminer",
        ] {
            transport.set_default(name, MockReply::ok());
        }
        transport
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn push(&self, name: &'static str, reply: MockReply) {
        self.queued.lock().entry(name).or_default().push_back(reply);
    }

    pub(crate) fn set_default(&self, name: &'static str, reply: MockReply) {
        self.defaults.lock().insert(name, reply);
    }

    pub(crate) fn set_power(&self, watts: f64) {
        self.set_default("power", MockReply::Json(fixtures::power(watts)));
    }

    pub(crate) fn set_board_count(&self, count: usize) {
        self.set_default("devs", MockReply::Json(fixtures::boards(count)));
    }

    pub(crate) fn set_curtail_mode(&self, mode: &str) {
        self.set_default("config", MockReply::Json(fixtures::config("default", mode)));
    }

    /// Makes every call fail with a refused connection while `true`.
    pub(crate) fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.name == name).count()
    }

    pub(crate) fn parameters(&self, name: &str) -> Vec<Option<String>> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.parameter.clone())
            .collect()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, name: &'static str) -> MockReply {
        if let Some(reply) = self.queued.lock().get_mut(name).and_then(VecDeque::pop_front) {
            return reply;
        }
        self.defaults
            .lock()
            .get(name)
            .cloned()
            .unwrap_or(MockReply::Refused)
    }
}

impl Transport for MockTransport {
    async fn call<C: Command + Sync>(&self, command: &C) -> Result<RawResponse, TransportError> {
        let name = command.name();
        self.calls.lock().push(RecordedCall {
            name,
            parameter: command.parameter(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = if self.unreachable.load(Ordering::SeqCst) {
            MockReply::Refused
        } else {
            self.next_reply(name)
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            MockReply::Json(body) => RawResponse::from_value(name, body),
            MockReply::Timeout => Err(TransportError::Timeout(5000)),
            MockReply::Refused => Err(TransportError::ConnectionRefused(format!(
                "{name}: connection refused"
            ))),
        }
    }
}

/// LuxOS response bodies for a typical three-board miner.
pub(crate) mod fixtures {
    use serde_json::{Value, json};

    fn ok(msg: &str) -> Value {
        json!([{"STATUS": "S", "Msg": msg}])
    }

    pub(crate) fn version() -> Value {
        json!({
            "STATUS": ok("LUXminer versions"),
            "VERSION": [{"LUXminer": "2024.5.1.155013-f2b6d0c0", "API": "3.7", "Type": "Antminer S19j Pro"}]
        })
    }

    pub(crate) fn summary(accepted: u64, rejected: u64, stale: u64) -> Value {
        json!({
            "STATUS": ok("Summary"),
            "SUMMARY": [{
                "GHS 5s": 100_000.0,
                "GHS 1m": 99_500.0,
                "GHS 15m": 99_800.0,
                "GHS 30m": 99_900.0,
                "GHS av": 99_700.0,
                "Accepted": accepted,
                "Rejected": rejected,
                "Stale": stale,
                "Hardware Errors": 12,
                "Elapsed": 86_400
            }]
        })
    }

    pub(crate) fn power(watts: f64) -> Value {
        json!({"STATUS": ok("Power"), "POWER": [{"Watts": watts, "PSU": true}]})
    }

    pub(crate) fn temps() -> Value {
        json!({
            "STATUS": ok("3 Temp(s)"),
            "TEMPS": [
                {"ID": 0, "TopLeft": 60, "TopRight": 62, "BottomLeft": 58, "BottomRight": 65, "Board": 55, "Chip": 70},
                {"ID": 1, "TopLeft": 61, "TopRight": 63, "BottomLeft": 59, "BottomRight": 66, "Board": 56, "Chip": 71},
                {"ID": 2, "TopLeft": 59, "TopRight": 61, "BottomLeft": 57, "BottomRight": 64, "Board": 54, "Chip": 72.5}
            ]
        })
    }

    pub(crate) fn fans() -> Value {
        json!({
            "STATUS": ok("4 Fan(s)"),
            "FANS": [
                {"ID": 0, "RPM": 4200, "Speed": 60},
                {"ID": 1, "RPM": 4300, "Speed": 60},
                {"ID": 2, "RPM": 4100, "Speed": 60},
                {"ID": 3, "RPM": 4400, "Speed": 60}
            ]
        })
    }

    pub(crate) fn fans_without_rpm() -> Value {
        json!({
            "STATUS": ok("4 Fan(s)"),
            "FANS": [
                {"ID": 0, "Speed": 60},
                {"ID": 1, "Speed": 60},
                {"ID": 2, "Speed": 60},
                {"ID": 3, "Speed": 60}
            ]
        })
    }

    pub(crate) fn pools() -> Value {
        json!({
            "STATUS": ok("1 Pool(s)"),
            "POOLS": [{
                "POOL": 0,
                "URL": "stratum+tcp://pool.example.com:3333",
                "Stratum URL": "pool.example.com",
                "Status": "Alive",
                "Stratum Active": true,
                "User": "acct.worker1",
                "Stratum Difficulty": 65536.0
            }]
        })
    }

    pub(crate) fn profiles() -> Value {
        json!({
            "STATUS": ok("Profiles"),
            "PROFILES": [
                {"Profile Name": "310MHz", "Watts": 2200, "Hashrate": 80.1, "Frequency": 310},
                {"Profile Name": "default", "Watts": 3250, "Hashrate": 104.0, "Frequency": 400},
                {"Profile Name": "450MHz", "Watts": 3700, "Hashrate": 115.2, "Frequency": 450}
            ]
        })
    }

    pub(crate) fn atm() -> Value {
        json!({"STATUS": ok("ATM"), "ATM": [{"Enabled": true}]})
    }

    pub(crate) fn config(profile: &str, curtail_mode: &str) -> Value {
        json!({
            "STATUS": ok("LUXminer config"),
            "CONFIG": [{
                "Profile": profile,
                "CurtailMode": curtail_mode,
                "IsTuning": false,
                "Hostname": "miner-01",
                "Model": "S19j Pro",
                "SystemStatus": "Normal"
            }]
        })
    }

    pub(crate) fn devs() -> Value {
        boards(3)
    }

    pub(crate) fn boards(count: usize) -> Value {
        let devs: Vec<Value> = (0..count).map(|asc| json!({"ASC": asc})).collect();
        json!({"STATUS": ok(&format!("{count} ASC(s)")), "DEVS": devs})
    }

    pub(crate) fn devdetails() -> Value {
        json!({
            "STATUS": ok("Device Details"),
            "DEVDETAILS": [{"DEVDETAILS": 0, "Chips": 126}, {"DEVDETAILS": 1, "Chips": 126}, {"DEVDETAILS": 2, "Chips": 126}]
        })
    }

    pub(crate) fn tempctrl() -> Value {
        json!({
            "STATUS": ok("Temp control"),
            "TEMPCTRL": [{"Mode": "Auto", "Target": 75, "Hot": 85, "Dangerous": 95}]
        })
    }

    pub(crate) fn session(session_id: &str) -> Value {
        json!({"STATUS": ok("Session"), "SESSION": [{"SessionID": session_id}]})
    }

    /// Bodies for every poll-round query.
    pub(crate) fn healthy(power_watts: f64) -> Vec<(&'static str, Value)> {
        vec![
            ("version", version()),
            ("summary", summary(1200, 3, 1)),
            ("power", power(power_watts)),
            ("temps", temps()),
            ("fans", fans()),
            ("pools", pools()),
            ("profiles", profiles()),
            ("atm", atm()),
            ("config", config("default", "None")),
            ("devs", devs()),
            ("devdetails", devdetails()),
            ("tempctrl", tempctrl()),
        ]
    }
}
