// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! LuxOS write-session handshake.

use serde::Deserialize;

use crate::command::{ControlCommand, SessionCommand, SessionScoped};
use crate::error::CommandError;
use crate::protocol::{LinkGuard, RawResponse, Transport};

const SESSION_SECTION: &str = "SESSION";

#[derive(Debug, Deserialize)]
struct SessionEntry {
    #[serde(rename = "SessionID", default)]
    session_id: Option<String>,
}

fn session_id(response: &RawResponse) -> Option<String> {
    response
        .section::<SessionEntry>(SESSION_SECTION)
        .ok()
        .flatten()?
        .into_iter()
        .next()?
        .session_id
        .filter(|id| !id.trim().is_empty())
}

/// Runs `command` inside a fresh write session on an already held link.
///
/// The sequence is `session` (must report no open session), `logon`, the
/// command itself carrying the session id, then `logoff`. Logoff always
/// follows a successful logon; its failure is only logged.
pub(crate) async fn run_in_session<T: Transport>(
    link: &LinkGuard<'_, T>,
    command: &ControlCommand,
) -> Result<RawResponse, CommandError> {
    let current = link.call(&SessionCommand::Query).await?;
    if let Some(open) = session_id(&current) {
        tracing::warn!(session = %open, "Another write session is active");
        return Err(CommandError::SessionConflict);
    }

    let logon = link.call(&SessionCommand::Logon).await?;
    let sid = session_id(&logon)
        .ok_or_else(|| CommandError::Rejected("logon returned no session id".to_string()))?;

    let result = link.call(&SessionScoped::new(&sid, command)).await;

    if let Err(err) = link.call(&SessionCommand::Logoff { session_id: sid }).await {
        tracing::warn!(error = %err, "Failed to close write session");
    }

    Ok(result?)
}
