// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP miner builder.

use std::time::Duration;

use crate::config::SyncConfig;
use crate::device::Miner;
use crate::error::Error;
use crate::protocol::{HttpConfig, HttpTransport};

/// Builder for a [`Miner`] reached over the LuxOS HTTP API.
///
/// Created with [`Miner::http`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use luxos_sync::Miner;
/// use luxos_sync::config::SyncConfig;
///
/// # fn example() -> luxos_sync::Result<()> {
/// let miner = Miner::http("192.168.1.50")
///     .with_port(8080)
///     .with_timeout(Duration::from_secs(3))
///     .with_config(SyncConfig::default().with_poll_interval(Duration::from_secs(5)))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MinerBuilder {
    http: HttpConfig,
    config: SyncConfig,
}

impl MinerBuilder {
    pub(crate) fn new(http: HttpConfig) -> Self {
        Self {
            http,
            config: SyncConfig::default(),
        }
    }

    /// Sets the API port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.http = self.http.with_port(port);
        self
    }

    /// Sets the per-call transport timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    /// Replaces the synchronizer configuration.
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the HTTP configuration.
    #[must_use]
    pub fn http_config(&self) -> &HttpConfig {
        &self.http
    }

    /// Builds the miner. No request is made until it is polled.
    ///
    /// # Errors
    ///
    /// - `Error::Value` if the configuration is invalid
    /// - `Error::Transport` if the host is empty or the HTTP client cannot be
    ///   created
    pub fn build(self) -> Result<Miner<HttpTransport>, Error> {
        self.config.validate()?;
        let transport = self.http.into_transport()?;
        Miner::new(transport, self.config)
    }
}
