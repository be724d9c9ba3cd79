// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! LuxOS API command definitions.
//!
//! Every request to the device is a command name plus an optional string
//! parameter, posted as JSON to the `/api` endpoint.
//!
//! # Available Commands
//!
//! | Command Type | Purpose | Example |
//! |-------------|---------|---------|
//! | [`QueryCommand`] | Read-only telemetry | `summary`, `power`, `fans` |
//! | [`ControlCommand`] | Side-effecting actions | `powertargetset power=3000` |
//! | [`SessionCommand`] | Write-session handshake | `logon`, `logoff <sid>` |
//!
//! Control commands must be wrapped in a [`SessionScoped`] command carrying
//! the session id returned by `logon`.
//!
//! # Examples
//!
//! ```
//! use luxos_sync::command::{Command, ControlCommand, QueryCommand};
//!
//! let query = QueryCommand::Summary;
//! assert_eq!(query.name(), "summary");
//! assert_eq!(query.parameter(), None);
//!
//! let set = ControlCommand::SetPowerTarget { watts: 3000 };
//! assert_eq!(set.name(), "powertargetset");
//! assert_eq!(set.parameter(), Some("power=3000".to_string()));
//! assert!(set.is_side_effecting());
//! ```

mod control;
mod query;
mod session;

pub use control::ControlCommand;
pub use query::QueryCommand;
pub use session::{SessionCommand, SessionScoped};

use serde::Serialize;

/// A command that can be sent to a LuxOS device.
pub trait Command {
    /// Returns the API command name, e.g. `"summary"`.
    fn name(&self) -> &'static str;

    /// Returns the command parameter, if any.
    fn parameter(&self) -> Option<String>;

    /// Returns `true` if executing the command changes device state.
    ///
    /// Side-effecting commands are never retried after a request may have
    /// reached the device.
    fn is_side_effecting(&self) -> bool {
        false
    }

    /// Builds the JSON request body for this command.
    fn to_request(&self) -> RequestBody {
        RequestBody {
            command: self.name(),
            parameter: self.parameter(),
        }
    }
}

/// JSON body posted to the `/api` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestBody {
    /// The command name.
    pub command: &'static str,
    /// The optional parameter string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}
