// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Retry policy for transport calls.

use std::time::Duration;

use crate::command::Command;
use crate::error::{TransportError, ValueError};
use crate::protocol::{RawResponse, Transport};

/// Bounded, fixed-backoff retry of transient transport failures.
///
/// Read-only commands are retried on timeouts and refused connections.
/// Side-effecting commands get at most `side_effect_retries` extra attempts,
/// and only when the connection was refused: a refused connection cannot
/// have delivered the request, a timeout might have.
///
/// Device-reported errors are never retried.
///
/// # Examples
///
/// ```
/// use luxos_sync::protocol::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default()
///     .with_max_retries(3)
///     .with_backoff(Duration::from_millis(250));
/// assert_eq!(policy.max_retries(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
    side_effect_retries: u32,
}

impl RetryPolicy {
    /// Default number of retries for read-only commands.
    pub const DEFAULT_MAX_RETRIES: u32 = 2;
    /// Default delay between attempts.
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);
    /// Default number of retries for side-effecting commands.
    pub const DEFAULT_SIDE_EFFECT_RETRIES: u32 = 1;
    /// Upper bound on any retry count.
    pub const MAX_RETRIES_LIMIT: u32 = 10;

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
            side_effect_retries: 0,
        }
    }

    /// Sets the retry count for read-only commands.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the delay between attempts.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the retry count for side-effecting commands.
    #[must_use]
    pub fn with_side_effect_retries(mut self, retries: u32) -> Self {
        self.side_effect_retries = retries;
        self
    }

    /// Returns the retry count for read-only commands.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the delay between attempts.
    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Returns the retry count for side-effecting commands.
    #[must_use]
    pub fn side_effect_retries(&self) -> u32 {
        self.side_effect_retries
    }

    /// Checks the policy bounds.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if a retry count exceeds
    /// [`RetryPolicy::MAX_RETRIES_LIMIT`] or side-effect retries exceed one.
    pub fn validate(&self) -> Result<(), ValueError> {
        ValueError::check_range(
            "max_retries",
            f64::from(self.max_retries),
            0.0,
            f64::from(Self::MAX_RETRIES_LIMIT),
        )?;
        ValueError::check_range(
            "side_effect_retries",
            f64::from(self.side_effect_retries),
            0.0,
            1.0,
        )
    }

    fn should_retry<C: Command>(&self, command: &C, err: &TransportError, attempt: u32) -> bool {
        if command.is_side_effecting() {
            attempt < self.side_effect_retries
                && matches!(err, TransportError::ConnectionRefused(_))
        } else {
            attempt < self.max_retries && err.is_transient()
        }
    }

    /// Calls `command` on `transport`, retrying per this policy.
    ///
    /// # Errors
    ///
    /// Returns the last `TransportError` once retries are exhausted or the
    /// failure is not retryable.
    pub async fn call<T: Transport, C: Command + Sync>(
        &self,
        transport: &T,
        command: &C,
    ) -> Result<RawResponse, TransportError> {
        let mut attempt = 0;
        loop {
            match transport.call(command).await {
                Ok(response) => return Ok(response),
                Err(err) if self.should_retry(command, &err, attempt) => {
                    attempt += 1;
                    tracing::warn!(
                        command = command.name(),
                        attempt,
                        error = %err,
                        "Transient transport failure, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            backoff: Self::DEFAULT_BACKOFF,
            side_effect_retries: Self::DEFAULT_SIDE_EFFECT_RETRIES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ControlCommand, QueryCommand};
    use crate::protocol::mock::{MockReply, MockTransport};

    #[tokio::test(start_paused = true)]
    async fn read_retries_transient_failures() {
        let transport = MockTransport::new();
        transport.push("power", MockReply::Timeout);
        transport.push("power", MockReply::Refused);
        transport.push("power", MockReply::json(serde_json::json!({"POWER": [{"Watts": 10}]})));

        let response = RetryPolicy::default()
            .call(&transport, &QueryCommand::Power)
            .await
            .unwrap();
        assert_eq!(response.command(), "power");
        assert_eq!(transport.call_count("power"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn read_gives_up_after_max_retries() {
        let transport = MockTransport::new();
        for _ in 0..5 {
            transport.push("summary", MockReply::Timeout);
        }

        let err = RetryPolicy::default()
            .call(&transport, &QueryCommand::Summary)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
        assert_eq!(transport.call_count("summary"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn device_errors_are_not_retried() {
        let transport = MockTransport::new();
        transport.push("summary", MockReply::error("busy"));

        let err = RetryPolicy::default()
            .call(&transport, &QueryCommand::Summary)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected { .. }));
        assert_eq!(transport.call_count("summary"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn side_effect_is_not_retried_after_timeout() {
        let transport = MockTransport::new();
        transport.push("rebootdevice", MockReply::Timeout);

        let err = RetryPolicy::default()
            .call(&transport, &ControlCommand::Reboot)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
        assert_eq!(transport.call_count("rebootdevice"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn side_effect_gets_one_retry_when_refused() {
        let transport = MockTransport::new();
        transport.push("rebootdevice", MockReply::Refused);
        transport.push("rebootdevice", MockReply::Refused);

        let err = RetryPolicy::default()
            .call(&transport, &ControlCommand::Reboot)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionRefused(_)));
        assert_eq!(transport.call_count("rebootdevice"), 2);
    }

    #[test]
    fn validate_limits_side_effect_retries() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(
            RetryPolicy::default()
                .with_side_effect_retries(2)
                .validate()
                .is_err()
        );
    }
}
