// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lenient scalar decoding for device fields.
//!
//! Firmware versions disagree on whether numbers are sent as JSON numbers
//! or strings. Each function here accepts both and maps anything unusable
//! (wrong type, unparsable text, non-finite) to `None`, so a single odd
//! field never fails a whole section. Use with
//! `#[serde(default, deserialize_with = "...")]`.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Unsigned(u64),
    Float(f64),
    Flag(bool),
    Text(String),
    Other(IgnoredAny),
}

/// Decodes a float from a number or numeric string.
pub(crate) fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Loose::deserialize(deserializer)? {
        #[allow(clippy::cast_precision_loss)]
        Loose::Unsigned(n) => Some(n as f64),
        Loose::Float(n) => Some(n),
        Loose::Text(s) => s.trim().parse::<f64>().ok(),
        Loose::Flag(_) | Loose::Other(_) => None,
    }
    .filter(|n| n.is_finite()))
}

/// Decodes a non-negative integer from a number or numeric string.
pub(crate) fn unsigned<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    Ok(match Loose::deserialize(deserializer)? {
        Loose::Unsigned(n) => Some(n),
        Loose::Text(s) => s.trim().parse::<u64>().ok(),
        Loose::Float(_) | Loose::Flag(_) | Loose::Other(_) => None,
    })
}

/// Decodes a flag from a boolean, `0`/`1`, or `true`/`false`/`Y`/`N` text.
pub(crate) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Loose::deserialize(deserializer)? {
        Loose::Flag(b) => Some(b),
        Loose::Unsigned(n) => Some(n != 0),
        Loose::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "y" | "yes" | "1" => Some(true),
            "false" | "n" | "no" | "0" => Some(false),
            _ => None,
        },
        Loose::Float(_) | Loose::Other(_) => None,
    })
}

/// Decodes a non-empty string.
pub(crate) fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Loose::deserialize(deserializer)? {
        Loose::Text(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}
