// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.
//!
//! Every function takes `&Database` and runs inside a single
//! `connection().call()` closure, so multi-statement read-decide-write
//! sequences are atomic with respect to concurrent callers.

pub mod agent_configs;
pub mod contacts;
pub mod conversations;
pub mod instances;
pub mod messages;
pub mod reactions;
pub mod rules;
pub mod sectors;
pub mod tickets;

/// Parses a TEXT column into one of the closed domain enums.
pub(crate) fn parse_enum<T: std::str::FromStr>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    raw.parse::<T>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized value `{raw}`").into(),
        )
    })
}

/// Parses a JSON TEXT column into a string vector.
pub(crate) fn parse_string_vec(idx: usize, raw: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parses a JSON TEXT column into a weekday vector.
pub(crate) fn parse_u8_vec(idx: usize, raw: &str) -> rusqlite::Result<Vec<u8>> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
