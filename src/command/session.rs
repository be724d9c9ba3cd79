// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Write-session handshake commands.

use crate::command::Command;

/// Commands managing the device's single write session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Query the currently open session, if any.
    Query,
    /// Open a new session.
    Logon,
    /// Close the given session.
    Logoff {
        /// The session to close.
        session_id: String,
    },
}

impl Command for SessionCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Query => "session",
            Self::Logon => "logon",
            Self::Logoff { .. } => "logoff",
        }
    }

    fn parameter(&self) -> Option<String> {
        match self {
            Self::Query | Self::Logon => None,
            Self::Logoff { session_id } => Some(session_id.clone()),
        }
    }

    fn is_side_effecting(&self) -> bool {
        !matches!(self, Self::Query)
    }
}

/// A command executed inside an open write session.
///
/// The session id is prepended to the inner command's parameter.
///
/// # Examples
///
/// ```
/// use luxos_sync::command::{Command, ControlCommand, SessionScoped};
///
/// let inner = ControlCommand::SetPowerTarget { watts: 2800 };
/// let scoped = SessionScoped::new("abc123", &inner);
/// assert_eq!(scoped.name(), "powertargetset");
/// assert_eq!(scoped.parameter(), Some("abc123,power=2800".to_string()));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SessionScoped<'a, C: Command> {
    session_id: &'a str,
    inner: &'a C,
}

impl<'a, C: Command> SessionScoped<'a, C> {
    /// Wraps `inner` for execution in `session_id`.
    #[must_use]
    pub fn new(session_id: &'a str, inner: &'a C) -> Self {
        Self { session_id, inner }
    }
}

impl<C: Command> Command for SessionScoped<'_, C> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn parameter(&self) -> Option<String> {
        match self.inner.parameter() {
            Some(params) => Some(format!("{},{params}", self.session_id)),
            None => Some(self.session_id.to_string()),
        }
    }

    fn is_side_effecting(&self) -> bool {
        self.inner.is_side_effecting()
    }
}
