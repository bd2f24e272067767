// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read path: newest manifest generation, `index` body, optional decryption.

use std::sync::Arc;

use super::manifest::{ArticleManifest, ManifestError};
use crate::blockchain::Visibility;
use crate::crypto::{decrypt_article, is_encrypted, looks_encrypted, ArticleKeyCache};
use crate::error::Result;
use crate::gateway::{ContentSource, GatewayError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleBody {
    Plain(String),
    Decrypted(String),
    /// Ciphertext with no cached key for it.
    Locked(String),
    /// Only the initial manifest of an encrypted article is visible; its
    /// `index` is the placeholder (shared text or one of the article's own
    /// assets).
    Pending {
        index_id: String,
        /// Placeholder text; `None` for binary assets.
        text: Option<String>,
    },
}

impl ArticleBody {
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, ArticleBody::Plain(_))
    }

    pub fn text(&self) -> &str {
        match self {
            ArticleBody::Plain(s) | ArticleBody::Decrypted(s) | ArticleBody::Locked(s) => s,
            ArticleBody::Pending { text, .. } => text.as_deref().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedArticle {
    pub article_id: String,
    pub manifest_id: String,
    pub manifest: ArticleManifest,
    pub body: ArticleBody,
}

pub struct ArticleReader {
    source: Arc<dyn ContentSource>,
    keys: Option<Arc<ArticleKeyCache>>,
}

impl ArticleReader {
    pub fn new(source: Arc<dyn ContentSource>, keys: Option<Arc<ArticleKeyCache>>) -> Self {
        Self { source, keys }
    }

    /// Resolve `article_id` to its newest body.
    ///
    /// `visibility` is the on-chain flag when known; without it the content
    /// itself is inspected. An encrypted article whose update manifest is not
    /// visible yet resolves to [`ArticleBody::Pending`]. Never prompts the
    /// wallet.
    pub async fn resolve(
        &self,
        article_id: &str,
        visibility: Option<Visibility>,
    ) -> Result<ResolvedArticle> {
        let manifest_id = self
            .source
            .latest_manifest_id(article_id)
            .await?
            .unwrap_or_else(|| article_id.to_string());
        let manifest = self.source.fetch_manifest(&manifest_id).await?;
        let index = manifest.index().ok_or(ManifestError::MissingIndex)?;

        let raw = self.source.fetch(index).await?;
        let is_root = manifest_id == article_id;

        let body = match String::from_utf8(raw) {
            Ok(text) if is_encrypted(&text, visibility) => {
                if !looks_encrypted(&text) {
                    // flagged encrypted, but the content is still the placeholder
                    ArticleBody::Pending {
                        index_id: index.to_string(),
                        text: Some(text),
                    }
                } else {
                    match self.cached_key(article_id)? {
                        Some(key) => ArticleBody::Decrypted(decrypt_article(&text, &key)?),
                        None => ArticleBody::Locked(text),
                    }
                }
            }
            Ok(text) => ArticleBody::Plain(text),
            Err(_) if is_root => ArticleBody::Pending {
                index_id: index.to_string(),
                text: None,
            },
            Err(_) => {
                return Err(GatewayError::Decode(format!("body {index} is not UTF-8")).into())
            }
        };

        tracing::debug!(
            article_id,
            manifest_id = %manifest_id,
            encrypted = body.is_encrypted(),
            "Resolved article"
        );
        Ok(ResolvedArticle {
            article_id: article_id.to_string(),
            manifest_id,
            manifest,
            body,
        })
    }

    /// Prompt for the article key if needed, then resolve.
    pub async fn unlock(&self, article_id: &str) -> Result<ResolvedArticle> {
        if let Some(keys) = &self.keys {
            keys.key_for(article_id).await?;
        }
        self.resolve(article_id, Some(Visibility::Encrypted)).await
    }

    fn cached_key(&self, article_id: &str) -> Result<Option<crate::crypto::ArticleKey>> {
        match &self.keys {
            Some(keys) => keys.cached_key(article_id),
            None => Ok(None),
        }
    }
}
