// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport layer for talking to LuxOS devices.
//!
//! # Components
//!
//! - [`Transport`]: one request/response call, no retries, no state
//! - [`HttpTransport`]: the HTTP/JSON implementation (feature `http`)
//! - [`RetryPolicy`]: bounded retries of transient failures
//! - [`DeviceLink`]: serializes every call to one device so that at most one
//!   request is in flight at any time
//!
//! Responses are validated once, in [`RawResponse::from_body`]: the body must
//! be a JSON object, and a device-reported error status becomes
//! [`TransportError::Rejected`].

#[cfg(feature = "http")]
mod http;
mod link;
#[cfg(test)]
pub(crate) mod mock;
mod retry;

#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpTransport};
pub use link::{DeviceLink, LinkGuard};
pub use retry::RetryPolicy;

use std::future::Future;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::command::Command;
use crate::error::{NormalizeError, TransportError};

/// A validated response to one command.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    command: &'static str,
    body: Value,
}

impl RawResponse {
    /// Validates a response body received for `command`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::MalformedResponse` if the body is not a JSON
    /// object, or `TransportError::Rejected` if the device reported an error
    /// status (`STATUS[0].STATUS == "E"`).
    pub fn from_body(command: &'static str, body: &str) -> Result<Self, TransportError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| TransportError::MalformedResponse(format!("{command}: {e}")))?;
        Self::from_value(command, value)
    }

    /// Validates an already decoded response body.
    ///
    /// # Errors
    ///
    /// Same as [`RawResponse::from_body`].
    pub fn from_value(command: &'static str, body: Value) -> Result<Self, TransportError> {
        if !body.is_object() {
            return Err(TransportError::MalformedResponse(format!(
                "{command}: expected a JSON object"
            )));
        }

        let response = Self { command, body };
        if response.status_code() == Some("E") {
            return Err(TransportError::Rejected {
                message: response
                    .message()
                    .unwrap_or("unknown device error")
                    .to_string(),
            });
        }
        Ok(response)
    }

    /// Returns the command this response answers.
    #[must_use]
    pub fn command(&self) -> &'static str {
        self.command
    }

    /// Returns the decoded JSON body.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Returns the status code letter (`S`, `I`, `W`, `E`), if present.
    #[must_use]
    pub fn status_code(&self) -> Option<&str> {
        self.status_entry()?.get("STATUS")?.as_str()
    }

    /// Returns the human-readable status message, if present.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.status_entry()?.get("Msg")?.as_str()
    }

    fn status_entry(&self) -> Option<&Value> {
        self.body.get("STATUS")?.as_array()?.first()
    }

    /// Decodes the entries of a response section.
    ///
    /// Returns `Ok(None)` when the section is absent or null.
    ///
    /// # Errors
    ///
    /// Returns `NormalizeError::Malformed` if the section is present but is
    /// not an array of entries of the expected shape.
    pub fn section<T: DeserializeOwned>(
        &self,
        key: &'static str,
    ) -> Result<Option<Vec<T>>, NormalizeError> {
        match self.body.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value @ Value::Array(_)) => Vec::<T>::deserialize(value)
                .map(Some)
                .map_err(|e| NormalizeError::Malformed {
                    section: key,
                    reason: e.to_string(),
                }),
            Some(_) => Err(NormalizeError::Malformed {
                section: key,
                reason: "expected an array".to_string(),
            }),
        }
    }
}

/// A single request/response channel to a device.
///
/// Implementations perform exactly one attempt per call and enforce their
/// own per-call timeout; retries belong to [`RetryPolicy`].
pub trait Transport: Send + Sync + 'static {
    /// Sends `command` and returns the validated response.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` on network failure, timeout, malformed
    /// payload, or a device-reported error status.
    fn call<C: Command + Sync>(
        &self,
        command: &C,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}
