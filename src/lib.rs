// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State synchronizer and power-limit control loop for LuxOS miners.
//!
//! This library keeps an in-memory view of a LuxOS mining device up to date
//! and drives its power limit towards an operator-chosen target.
//!
//! # Components
//!
//! - **Transport** ([`protocol`]): request/response calls to the device API
//!   with per-call timeout and a retry policy that never re-issues a
//!   side-effecting command that may have reached the device
//! - **Normalizer** ([`telemetry`]): turns raw responses into a canonical
//!   [`DeviceSnapshot`], absorbing missing fields, string-typed numbers,
//!   out-of-range values and counter resets
//! - **State cache** ([`state`]): latest complete snapshot, online/offline
//!   tracking, lock-free reads via `Arc`
//! - **Poll scheduler** ([`scheduler`]): fixed-cadence polling that skips
//!   instead of queueing overdue ticks
//! - **Power controller** ([`control`]): bounded-step proportional control
//!   with a dead-band and a no-progress escape
//! - **Command gateway** ([`gateway`]): one command in flight, minimum
//!   spacing between commands, exactly one execution per submission
//!
//! [`Miner`] ties them together for one device.
//!
//! # Quick Start
//!
//! ```no_run
//! use luxos_sync::Miner;
//!
//! #[tokio::main]
//! async fn main() -> luxos_sync::Result<()> {
//!     let miner = Miner::http("192.168.1.50").build()?;
//!
//!     let snapshot = miner.poll_once().await?;
//!     println!(
//!         "{} draws {} W at {:.1} TH/s",
//!         snapshot.model.as_deref().unwrap_or("miner"),
//!         snapshot.power_watts,
//!         snapshot.hashrate.five_sec,
//!     );
//!
//!     // Converge on 3 kW, polling every 10 s
//!     miner.set_target(Some(3000.0))?;
//!     miner.start();
//!     tokio::time::sleep(std::time::Duration::from_secs(120)).await;
//!     println!("{:?}", miner.controller_status());
//!
//!     miner.stop().await
//! }
//! ```
//!
//! # Operator commands
//!
//! ```no_run
//! # async fn example(miner: luxos_sync::Miner<luxos_sync::protocol::HttpTransport>) -> luxos_sync::Result<()> {
//! miner.set_profile("310MHz").await?;
//! miner.sleep().await?;
//! miner.wake().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.

pub mod command;
pub mod config;
pub mod control;
mod device;
pub mod error;
pub mod event;
pub mod gateway;
pub mod protocol;
pub mod scheduler;
pub mod state;
pub mod telemetry;
pub mod types;

pub use config::SyncConfig;
pub use control::{ControlTarget, ControllerMode, ControllerStatus, SuspendReason};
#[cfg(feature = "http")]
pub use device::MinerBuilder;
pub use device::Miner;
pub use error::{CommandError, Error, NormalizeError, Result, TransportError, ValueError};
pub use event::{DeviceId, SyncEvent};
pub use gateway::Ack;
pub use state::DeviceSnapshot;
pub use types::{Hashrate, ProfileInfo, ShareCounters, SleepState};
