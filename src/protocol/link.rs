// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exclusive access to one device.

use tokio::sync::{Mutex, MutexGuard};

use crate::command::Command;
use crate::error::TransportError;
use crate::protocol::{RawResponse, RetryPolicy, Transport};

/// The single path to a device's API.
///
/// Poll rounds and command executions both hold a [`LinkGuard`] for their
/// whole duration, so a poll never races a command and at most one request
/// is in flight per device.
#[derive(Debug)]
pub struct DeviceLink<T> {
    transport: T,
    retry: RetryPolicy,
    io: Mutex<()>,
}

impl<T: Transport> DeviceLink<T> {
    /// Creates a link over `transport` using `retry` for every call.
    #[must_use]
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self {
            transport,
            retry,
            io: Mutex::new(()),
        }
    }

    /// Waits for exclusive access to the device.
    pub async fn acquire(&self) -> LinkGuard<'_, T> {
        LinkGuard {
            link: self,
            _io: self.io.lock().await,
        }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Exclusive access to a device for a sequence of calls.
#[derive(Debug)]
pub struct LinkGuard<'a, T> {
    link: &'a DeviceLink<T>,
    _io: MutexGuard<'a, ()>,
}

impl<T: Transport> LinkGuard<'_, T> {
    /// Calls `command`, applying the link's retry policy.
    ///
    /// # Errors
    ///
    /// Returns the final `TransportError` if every attempt failed.
    pub async fn call<C: Command + Sync>(&self, command: &C) -> Result<RawResponse, TransportError> {
        self.link.retry.call(&self.link.transport, command).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::command::QueryCommand;
    use crate::protocol::mock::MockTransport;

    #[tokio::test(start_paused = true)]
    async fn concurrent_holders_are_serialized() {
        let transport = MockTransport::miner(3000.0).with_delay(Duration::from_millis(200));
        let link = Arc::new(DeviceLink::new(transport, RetryPolicy::none()));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let link = Arc::clone(&link);
            tasks.push(tokio::spawn(async move {
                let guard = link.acquire().await;
                guard.call(&QueryCommand::Version).await.unwrap();
                guard.call(&QueryCommand::Power).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(link.transport().max_in_flight(), 1);
        assert_eq!(link.transport().call_count("version"), 4);
    }
}
