// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key builders for the local store layout.

use alloy::primitives::Address;

use crate::config::Environment;

/// Session key record of one owner in one environment.
///
/// Owner addresses are lowercased so checksum casing never splits records.
pub fn session_key(environment: Environment, owner: &Address) -> String {
    format!(
        "session-key/{}/{}",
        environment.as_str(),
        format!("{owner:?}").to_lowercase()
    )
}

/// Cached wallet signature for an article key.
pub fn article_signature(article_id: &str) -> String {
    format!("article-signature/{article_id}")
}

/// Upload id of the shared encrypted-article placeholder.
pub fn placeholder(environment: Environment) -> String {
    format!("placeholder/{}", environment.as_str())
}
