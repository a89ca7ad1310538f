// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for the gateway's routable-id scheme.
//!
//! A routable id ("jid") is `<local>@<domain>`. The domain tells the id
//! class apart: phone-derived user ids, group ids, transient privacy ids,
//! and broadcast pseudo-ids. Group ids may be composite
//! `<ownerphone>-<groupid>@g.us`. User ids may carry a `:device` suffix in
//! the local part.

/// Domain suffix for phone-derived user ids.
pub const USER_SUFFIX: &str = "@s.whatsapp.net";
/// Domain suffix for group ids.
pub const GROUP_SUFFIX: &str = "@g.us";
/// Domain suffix for transient (opaque, privacy-routed) participant ids.
pub const TRANSIENT_SUFFIX: &str = "@lid";
/// Domain suffix for broadcast pseudo-conversations; never ingested.
pub const BROADCAST_SUFFIX: &str = "@broadcast";

/// True for group routable ids.
pub fn is_group(jid: &str) -> bool {
    jid.ends_with(GROUP_SUFFIX)
}

/// True for transient participant ids.
pub fn is_transient(jid: &str) -> bool {
    jid.ends_with(TRANSIENT_SUFFIX)
}

/// True for broadcast pseudo-ids (status updates, broadcast lists).
pub fn is_broadcast(jid: &str) -> bool {
    jid.ends_with(BROADCAST_SUFFIX)
}

/// The local part of a routable id, with any `:device` suffix stripped.
pub fn bare(jid: &str) -> &str {
    let local = match jid.split_once('@') {
        Some((local, _)) => local,
        None => jid,
    };
    match local.split_once(':') {
        Some((bare, _)) => bare,
        None => local,
    }
}

/// Phone number derived from a routable id.
///
/// Transient and group ids carry no phone number; user ids yield the bare
/// local part when it looks like a phone number (digits only).
pub fn phone_from(jid: &str) -> Option<String> {
    if is_transient(jid) || is_group(jid) || is_broadcast(jid) {
        return None;
    }
    let local = bare(jid);
    if !local.is_empty() && local.chars().all(|c| c.is_ascii_digit()) {
        Some(local.to_string())
    } else {
        None
    }
}

/// The group-only id from a (possibly composite) group routable id.
///
/// `5511999999999-1620000000@g.us` yields `1620000000`; non-composite group
/// ids yield their whole local part. `None` for non-group ids.
pub fn group_id(jid: &str) -> Option<&str> {
    if !is_group(jid) {
        return None;
    }
    let local = bare(jid);
    Some(match local.split_once('-') {
        Some((_, group)) => group,
        None => local,
    })
}

/// The normalized group routable id keyed purely by the group-only id.
pub fn normalized_group_jid(jid: &str) -> Option<String> {
    group_id(jid).map(|g| format!("{g}{GROUP_SUFFIX}"))
}
