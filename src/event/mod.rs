// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synchronizer events.
//!
//! A [`Miner`](crate::Miner) publishes [`SyncEvent`]s on an [`EventBus`] backed
//! by tokio's broadcast channel, so any number of observers can follow online
//! transitions, controller suspensions and command failures.
//!
//! # Examples
//!
//! ```
//! use luxos_sync::event::{DeviceId, EventBus, SyncEvent};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! let device_id = DeviceId::new();
//! bus.publish(SyncEvent::online(device_id));
//! assert_eq!(rx.try_recv().unwrap().device_id(), device_id);
//! ```

mod device_id;
mod event_bus;
mod sync_event;

pub use device_id::DeviceId;
pub use event_bus::EventBus;
pub use sync_event::SyncEvent;
