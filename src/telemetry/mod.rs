// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Telemetry normalization.
//!
//! A poll round collects one [`RawResponse`] per [`QueryCommand`] into a
//! [`RawTelemetry`] bundle. The [`Normalizer`] turns the bundle into a
//! [`DeviceSnapshot`](crate::state::DeviceSnapshot), isolating every device
//! quirk from the rest of the crate:
//!
//! - GH/s are converted to TH/s
//! - numbers sent as strings are accepted
//! - missing fields are carried over from the previous snapshot, or set to a
//!   default and flagged when there is none
//! - out-of-range values are clamped and flagged
//! - decreasing share counters reset delta tracking
//!
//! # Examples
//!
//! ```
//! use luxos_sync::command::QueryCommand;
//! use luxos_sync::config::TelemetryLimits;
//! use luxos_sync::protocol::RawResponse;
//! use luxos_sync::telemetry::{Normalizer, RawTelemetry};
//!
//! let mut raw = RawTelemetry::new();
//! raw.insert(
//!     QueryCommand::Version,
//!     RawResponse::from_body("version", r#"{"VERSION":[{"LUXminer":"2024.5.1"}]}"#).unwrap(),
//! );
//! raw.insert(
//!     QueryCommand::Power,
//!     RawResponse::from_body("power", r#"{"POWER":[{"Watts":3010}]}"#).unwrap(),
//! );
//!
//! let mut normalizer = Normalizer::new(TelemetryLimits::default());
//! let snapshot = normalizer.normalize(&raw).unwrap();
//! assert_eq!(snapshot.firmware_version, "2024.5.1");
//! assert!((snapshot.power_watts - 3010.0).abs() < f64::EPSILON);
//! ```

mod lenient;
mod normalizer;
mod sections;
mod shares;

pub use normalizer::Normalizer;

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::command::QueryCommand;
use crate::error::NormalizeError;
use crate::protocol::RawResponse;

/// The responses gathered by one poll round, keyed by query.
///
/// Queries the device rejected are simply absent.
#[derive(Debug, Clone, Default)]
pub struct RawTelemetry {
    responses: HashMap<QueryCommand, RawResponse>,
}

impl RawTelemetry {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the response to `query`.
    pub fn insert(&mut self, query: QueryCommand, response: RawResponse) {
        self.responses.insert(query, response);
    }

    /// Returns the response to `query`, if it was received.
    #[must_use]
    pub fn get(&self, query: QueryCommand) -> Option<&RawResponse> {
        self.responses.get(&query)
    }

    /// Returns the number of responses received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Returns `true` if no response was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Decodes the section of `query`, failing on a malformed section.
    pub(crate) fn section<T: DeserializeOwned>(
        &self,
        query: QueryCommand,
    ) -> Result<Option<Vec<T>>, NormalizeError> {
        match self.get(query) {
            Some(response) => response.section(query.section()),
            None => Ok(None),
        }
    }

    /// Decodes the section of `query`, treating a malformed one as absent.
    pub(crate) fn entries<T: DeserializeOwned>(&self, query: QueryCommand) -> Option<Vec<T>> {
        self.section(query).unwrap_or_else(|err| {
            tracing::warn!(section = query.section(), error = %err, "Ignoring malformed section");
            None
        })
    }

    /// Decodes the first entry of the section of `query`.
    pub(crate) fn first<T: DeserializeOwned>(&self, query: QueryCommand) -> Option<T> {
        self.entries(query)?.into_iter().next()
    }
}
