// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP/JSON transport for LuxOS devices.

use std::time::Duration;

use reqwest::Client;

use crate::command::Command;
use crate::error::TransportError;
use crate::protocol::{RawResponse, Transport};

// ============================================================================
// HttpConfig - Connection parameters for one device
// ============================================================================

/// Configuration for a LuxOS HTTP endpoint.
///
/// The device is treated as a trusted LAN peer: plain HTTP, no credentials.
/// Write authorization happens through API sessions, not HTTP auth.
///
/// # Examples
///
/// ```
/// use luxos_sync::protocol::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new("192.168.1.60")
///     .with_port(8080)
///     .with_timeout(Duration::from_secs(3));
/// assert_eq!(config.api_url(), "http://192.168.1.60:8080/api");
///
/// // A host that already carries a scheme is used verbatim.
/// let config = HttpConfig::new("http://127.0.0.1:4028");
/// assert_eq!(config.api_url(), "http://127.0.0.1:4028/api");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    host: String,
    port: u16,
    timeout: Duration,
}

impl HttpConfig {
    /// Default LuxOS HTTP API port.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Default per-call timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a configuration for the specified host.
    ///
    /// # Arguments
    ///
    /// * `host` - Hostname or IP address, or a full `http://host:port` URL
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port. Ignored when the host is a full URL.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.host.contains("://") {
            self.host.trim_end_matches('/').to_string()
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// Returns the API endpoint URL.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("{}/api", self.base_url())
    }

    /// Creates an `HttpTransport` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the host is empty or the HTTP client cannot be created.
    pub fn into_transport(self) -> Result<HttpTransport, TransportError> {
        if self.host.trim().is_empty() {
            return Err(TransportError::InvalidAddress(
                "host is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(TransportError::Http)?;

        Ok(HttpTransport {
            api_url: self.api_url(),
            client,
            timeout: self.timeout,
        })
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// HTTP transport posting JSON commands to the device's `/api` endpoint.
///
/// # Examples
///
/// ```no_run
/// use luxos_sync::command::QueryCommand;
/// use luxos_sync::protocol::{HttpConfig, Transport};
///
/// # async fn example() -> luxos_sync::Result<()> {
/// let transport = HttpConfig::new("192.168.1.60").into_transport()?;
/// let response = transport.call(&QueryCommand::Power).await?;
/// println!("{}", response.body());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    api_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport for `host` with default port and timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(host: impl Into<String>) -> Result<Self, TransportError> {
        HttpConfig::new(host).into_transport()
    }

    /// Returns the API endpoint URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else if err.is_connect() {
            TransportError::ConnectionRefused(err.to_string())
        } else if err.is_decode() || err.is_body() {
            TransportError::MalformedResponse(err.to_string())
        } else {
            TransportError::Http(err)
        }
    }
}

impl Transport for HttpTransport {
    async fn call<C: Command + Sync>(&self, command: &C) -> Result<RawResponse, TransportError> {
        let request = command.to_request();

        tracing::debug!(url = %self.api_url, command = request.command, "Sending LuxOS command");

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(TransportError::HttpStatus(response.status().as_u16()));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;

        tracing::debug!(
            command = request.command,
            bytes = body.len(),
            "Received LuxOS response"
        );

        RawResponse::from_body(request.command, &body)
    }
}
