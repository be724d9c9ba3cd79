// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Latest known-good snapshot and online tracking.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::DeviceSnapshot;

/// Result of a cache mutation, as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Online status did not change.
    Unchanged,
    /// The device answered after being offline (or for the first time).
    CameOnline,
    /// The failure threshold was just crossed.
    WentOffline,
    /// The cache is closed; nothing was applied.
    Closed,
}

#[derive(Debug)]
struct Inner {
    snapshot: Option<Arc<DeviceSnapshot>>,
    consecutive_failures: u32,
    closed: bool,
}

/// Single-writer, many-reader holder of the latest snapshot.
///
/// Snapshots are swapped as whole `Arc`s, so readers never observe a
/// half-applied update. Poll failures only bump a counter; once it reaches
/// the offline threshold the cached snapshot is replaced by a copy with
/// `online = false`, keeping every telemetry field as last known.
///
/// # Examples
///
/// ```
/// use luxos_sync::state::StateCache;
///
/// let cache = StateCache::new(3);
/// assert!(cache.read().is_none());
/// assert!(!cache.is_online());
/// ```
#[derive(Debug)]
pub struct StateCache {
    inner: RwLock<Inner>,
    offline_threshold: u32,
    tx: watch::Sender<Option<Arc<DeviceSnapshot>>>,
}

impl StateCache {
    /// Creates an empty cache going offline after `offline_threshold`
    /// consecutive failures.
    #[must_use]
    pub fn new(offline_threshold: u32) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            inner: RwLock::new(Inner {
                snapshot: None,
                consecutive_failures: 0,
                closed: false,
            }),
            offline_threshold: offline_threshold.max(1),
            tx,
        }
    }

    /// Replaces the cached snapshot after a successful poll.
    ///
    /// The stored snapshot is always marked online and the failure counter
    /// is reset.
    pub fn update(&self, mut snapshot: DeviceSnapshot) -> Transition {
        snapshot.online = true;
        let snapshot = Arc::new(snapshot);

        let transition = {
            let mut inner = self.inner.write();
            if inner.closed {
                return Transition::Closed;
            }
            let was_online = inner.snapshot.as_ref().is_some_and(|s| s.online);
            inner.snapshot = Some(Arc::clone(&snapshot));
            inner.consecutive_failures = 0;
            if was_online {
                Transition::Unchanged
            } else {
                Transition::CameOnline
            }
        };

        self.tx.send_replace(Some(snapshot));
        transition
    }

    /// Records a failed poll without touching telemetry fields.
    ///
    /// Returns [`Transition::WentOffline`] exactly once per outage, when the
    /// counter reaches the threshold while a snapshot is online.
    pub fn mark_poll_failure(&self) -> Transition {
        let offline = {
            let mut inner = self.inner.write();
            if inner.closed {
                return Transition::Closed;
            }
            inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
            if inner.consecutive_failures < self.offline_threshold {
                return Transition::Unchanged;
            }
            match inner.snapshot.as_ref() {
                Some(current) if current.online => {
                    let offline = Arc::new(current.to_offline());
                    inner.snapshot = Some(Arc::clone(&offline));
                    offline
                }
                _ => return Transition::Unchanged,
            }
        };

        tracing::warn!(
            failures = self.offline_threshold,
            "Device went offline"
        );
        self.tx.send_replace(Some(offline));
        Transition::WentOffline
    }

    /// Returns the latest complete snapshot, if any poll ever succeeded.
    #[must_use]
    pub fn read(&self) -> Option<Arc<DeviceSnapshot>> {
        self.inner.read().snapshot.clone()
    }

    /// Returns `true` if the cached snapshot is online.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.inner.read().snapshot.as_ref().is_some_and(|s| s.online)
    }

    /// Returns the number of consecutive failed polls.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.read().consecutive_failures
    }

    /// Returns a receiver notified on every snapshot replacement.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DeviceSnapshot>>> {
        self.tx.subscribe()
    }

    /// Tears the cache down; later updates and failures are ignored.
    pub fn close(&self) {
        self.inner.write().closed = true;
    }

    /// Returns `true` once [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }
}
