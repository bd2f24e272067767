// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-article signature cache.
//!
//! Article keys never rotate, so the owner signs each article's key message
//! at most once per device. The raw signature is stored, not the key.

use std::sync::Arc;

use alloy::primitives::Bytes;
use serde::{Deserialize, Serialize};

use super::keys::{article_key_message, derive_article_key, ArticleKey};
use crate::blockchain::OwnerWallet;
use crate::error::Result;
use crate::storage::{keys, read_json, write_json, KeyValueStore};

#[derive(Debug, Serialize, Deserialize)]
struct SignatureEntry {
    signature: Bytes,
}

/// Resolves article keys from the local cache or a wallet prompt.
pub struct ArticleKeyCache {
    store: Arc<dyn KeyValueStore>,
    wallet: Arc<dyn OwnerWallet>,
}

impl ArticleKeyCache {
    pub fn new(store: Arc<dyn KeyValueStore>, wallet: Arc<dyn OwnerWallet>) -> Self {
        Self { store, wallet }
    }

    /// Key for `article_id` if its signature is cached. Never prompts.
    pub fn cached_key(&self, article_id: &str) -> Result<Option<ArticleKey>> {
        let entry: Option<SignatureEntry> =
            read_json(self.store.as_ref(), &keys::article_signature(article_id))?;
        match entry {
            Some(entry) => Ok(Some(derive_article_key(&entry.signature)?)),
            None => Ok(None),
        }
    }

    /// Key for `article_id`, prompting the owner to sign on a cache miss.
    pub async fn key_for(&self, article_id: &str) -> Result<ArticleKey> {
        if let Some(key) = self.cached_key(article_id)? {
            return Ok(key);
        }

        let signature = self
            .wallet
            .sign_message(&article_key_message(article_id))
            .await?;
        let key = derive_article_key(&signature)?;

        write_json(
            self.store.as_ref(),
            &keys::article_signature(article_id),
            &SignatureEntry { signature },
        )?;
        tracing::debug!(article_id, "Cached article key signature");

        Ok(key)
    }

    /// Drop the cached signature for `article_id`.
    pub fn forget(&self, article_id: &str) -> Result<()> {
        self.store.delete(&keys::article_signature(article_id))?;
        Ok(())
    }
}
