// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `luxos_sync` library.
//!
//! Failures are split by the layer that produces them: value validation,
//! transport (network and device status), telemetry normalization, and
//! command submission. Poll-path failures never reach callers as errors;
//! they are absorbed by the state cache and surface as offline state.

use std::time::Duration;

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A value or configuration failed validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A call to the device failed at the transport level.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A telemetry payload could not be normalized.
    #[error("normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// A command submission failed.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// The poll scheduler is not running.
    #[error("synchronizer is not running")]
    NotRunning,
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("{field} = {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
        /// The value that was provided.
        actual: f64,
    },

    /// A value is structurally invalid.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The requested profile is not offered by the device.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),
}

impl ValueError {
    /// Checks that `actual` lies in `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` otherwise (NaN is always out of range).
    pub fn check_range(
        field: &'static str,
        actual: f64,
        min: f64,
        max: f64,
    ) -> std::result::Result<(), Self> {
        if (min..=max).contains(&actual) {
            Ok(())
        } else {
            Err(Self::OutOfRange {
                field,
                min,
                max,
                actual,
            })
        }
    }
}

/// Errors produced while talking to the device.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The call did not complete within the per-call timeout.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The device could not be reached.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The device answered with something that is not a valid API response.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The device answered with a well-formed error status.
    #[error("device rejected request: {message}")]
    Rejected {
        /// Message reported by the device.
        message: String,
    },

    /// The device answered with a non-success HTTP status.
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// Any other HTTP client failure.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl TransportError {
    /// Returns `true` for network-layer failures that may succeed on retry.
    ///
    /// A device-reported error is a semantic failure and is never transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ConnectionRefused(_))
    }
}

/// Errors produced while turning raw responses into a snapshot.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A section payload is structurally unparsable.
    #[error("malformed {section} section: {reason}")]
    Malformed {
        /// The response section (e.g. `SUMMARY`).
        section: &'static str,
        /// Description of the failure.
        reason: String,
    },

    /// No firmware identity is available, neither in the payload nor cached.
    #[error("device identity is missing")]
    MissingIdentity,

    /// The firmware identity field is present but unusable.
    #[error("device identity is invalid: {0}")]
    InvalidIdentity(String),
}

/// Errors returned to whoever submitted a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Another command is in flight and the submission was non-blocking.
    #[error("another command is in flight")]
    Busy,

    /// The minimum inter-command spacing has not elapsed yet.
    #[error("command spacing not elapsed, retry in {} ms", .wait.as_millis())]
    Throttled {
        /// Remaining time until the next command may be issued.
        wait: Duration,
    },

    /// The device refused the command.
    #[error("command rejected: {0}")]
    Rejected(String),

    /// Another write session is open on the device.
    #[error("another session is active on the device")]
    SessionConflict,

    /// The command could not be delivered.
    #[error("transport failure: {0}")]
    Transport(TransportError),

    /// The bounded wait for a free command slot expired.
    #[error("timed out after {} ms waiting for the command slot", .0.as_millis())]
    Timeout(Duration),
}

impl From<TransportError> for CommandError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Rejected { message } => Self::Rejected(message),
            other => Self::Transport(other),
        }
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
