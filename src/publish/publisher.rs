// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Publish orchestration: uploads, the two-phase encrypted flow, and the
//! on-chain publish and edit calls.

use std::sync::Arc;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::manifest::{image_path, ArticleManifest, COVER, INDEX};
use super::{ArticleDraft, Asset};
use crate::blockchain::{DelegatedAction, Visibility};
use crate::config::Environment;
use crate::crypto::{encrypt_article, ArticleKeyCache};
use crate::error::Result;
use crate::funding::FundingController;
use crate::gateway::ContentSource;
use crate::session::{ActionSubmitter, SubmitOutcome};
use crate::storage::{keys, read_json, write_json, KeyValueStore};
use crate::uploader::{
    StorageNetwork, Tag, MANIFEST_CONTENT_TYPE, MARKDOWN_CONTENT_TYPE, OPAQUE_CONTENT_TYPE,
};

/// Body of the shared placeholder an encrypted article's initial manifest
/// points at when it has no asset to reuse.
pub const PLACEHOLDER_TEXT: &str = "This article is encrypted.";

/// Where the initial manifest's `index` came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderSource {
    /// An asset of this article.
    ReusedAsset(String),
    /// The environment's placeholder, uploaded earlier.
    Cached(String),
    /// The environment's placeholder, uploaded now.
    Uploaded(String),
}

impl PlaceholderSource {
    pub fn id(&self) -> &str {
        match self {
            PlaceholderSource::ReusedAsset(id)
            | PlaceholderSource::Cached(id)
            | PlaceholderSource::Uploaded(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlaceholderEntry {
    id: String,
}

/// Storage-side result of publishing.
#[derive(Debug, Clone)]
pub struct UploadedArticle {
    /// Permanent id: the first manifest.
    pub article_id: String,
    /// Newest manifest; equals `article_id` for plain articles.
    pub manifest_id: String,
    pub content_id: String,
    pub manifest: ArticleManifest,
    /// Set for encrypted articles.
    pub placeholder: Option<PlaceholderSource>,
}

#[derive(Debug, Clone)]
pub struct PublishedArticle {
    pub upload: UploadedArticle,
    pub outcome: SubmitOutcome,
}

/// Article being edited.
#[derive(Debug, Clone)]
pub struct EditTarget {
    /// Permanent storage id.
    pub article_id: String,
    /// On-chain article number.
    pub chain_id: U256,
    pub original_author: String,
}

#[derive(Debug, Clone)]
pub struct EditedArticle {
    pub manifest_id: String,
    pub manifest: ArticleManifest,
    pub outcome: SubmitOutcome,
}

pub struct Publisher {
    environment: Environment,
    storage: Arc<dyn StorageNetwork>,
    source: Arc<dyn ContentSource>,
    funding: Arc<FundingController>,
    keys: Arc<ArticleKeyCache>,
    store: Arc<dyn KeyValueStore>,
    submitter: Arc<ActionSubmitter>,
}

impl Publisher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        environment: Environment,
        storage: Arc<dyn StorageNetwork>,
        source: Arc<dyn ContentSource>,
        funding: Arc<FundingController>,
        keys: Arc<ArticleKeyCache>,
        store: Arc<dyn KeyValueStore>,
        submitter: Arc<ActionSubmitter>,
    ) -> Self {
        Self {
            environment,
            storage,
            source,
            funding,
            keys,
            store,
            submitter,
        }
    }

    /// Upload the article and record it on-chain.
    pub async fn publish(&self, draft: &ArticleDraft) -> Result<PublishedArticle> {
        let upload = self.upload_article(draft).await?;
        let action = DelegatedAction::publish(
            upload.article_id.clone(),
            draft.title.clone(),
            draft.category_id,
            draft.visibility,
            draft.royalty_bps,
        );
        let outcome = self.submitter.submit(&action).await?;

        tracing::info!(
            article_id = %upload.article_id,
            tx_hash = %outcome.tx_hash,
            path = ?outcome.path,
            "Article published"
        );
        Ok(PublishedArticle { upload, outcome })
    }

    /// Upload content and manifests. Nothing touches the chain.
    pub async fn upload_article(&self, draft: &ArticleDraft) -> Result<UploadedArticle> {
        let assets = self.upload_assets(draft).await?;
        match draft.visibility {
            Visibility::Public => self.upload_plain(draft, assets).await,
            Visibility::Encrypted => self.upload_encrypted(draft, assets).await,
        }
    }

    async fn upload_plain(
        &self,
        draft: &ArticleDraft,
        assets: Vec<(String, String)>,
    ) -> Result<UploadedArticle> {
        let content_id = self
            .upload(
                draft.body.as_bytes().to_vec(),
                vec![Tag::content_type(MARKDOWN_CONTENT_TYPE), Tag::app_name()],
            )
            .await?;

        let manifest = with_assets(ArticleManifest::new().with_entry(INDEX, &content_id), assets);
        let article_id = self.upload_manifest(&manifest, None).await?;

        tracing::info!(article_id = %article_id, content_id = %content_id, "Uploaded plain article");
        Ok(UploadedArticle {
            manifest_id: article_id.clone(),
            article_id,
            content_id,
            manifest,
            placeholder: None,
        })
    }

    async fn upload_encrypted(
        &self,
        draft: &ArticleDraft,
        assets: Vec<(String, String)>,
    ) -> Result<UploadedArticle> {
        let placeholder = self.placeholder(&assets).await?;
        let initial = with_assets(
            ArticleManifest::new().with_entry(INDEX, placeholder.id()),
            assets,
        );
        let article_id = self.upload_manifest(&initial, None).await?;

        let key = self.keys.key_for(&article_id).await?;
        let ciphertext = encrypt_article(&draft.body, &key)?;
        let content_id = self
            .upload(
                ciphertext.into_bytes(),
                vec![Tag::content_type(OPAQUE_CONTENT_TYPE), Tag::app_name()],
            )
            .await?;

        let manifest = initial.with_entry(INDEX, &content_id);
        let manifest_id = self.upload_manifest(&manifest, Some(&article_id)).await?;

        tracing::info!(
            article_id = %article_id,
            manifest_id = %manifest_id,
            placeholder = ?placeholder,
            "Uploaded encrypted article"
        );
        Ok(UploadedArticle {
            article_id,
            manifest_id,
            content_id,
            manifest,
            placeholder: Some(placeholder),
        })
    }

    /// Pick the initial manifest's `index`: an asset of this article when
    /// there is one, otherwise the environment's shared placeholder.
    async fn placeholder(&self, assets: &[(String, String)]) -> Result<PlaceholderSource> {
        if let Some((_, id)) = assets.first() {
            return Ok(PlaceholderSource::ReusedAsset(id.clone()));
        }

        let store_key = keys::placeholder(self.environment);
        if let Some(entry) = read_json::<PlaceholderEntry>(self.store.as_ref(), &store_key)? {
            return Ok(PlaceholderSource::Cached(entry.id));
        }

        let id = self
            .upload(
                PLACEHOLDER_TEXT.as_bytes().to_vec(),
                vec![Tag::content_type(MARKDOWN_CONTENT_TYPE), Tag::app_name()],
            )
            .await?;
        write_json(self.store.as_ref(), &store_key, &PlaceholderEntry { id: id.clone() })?;
        tracing::info!(
            placeholder_id = %id,
            env = self.environment.as_str(),
            "Uploaded shared placeholder"
        );
        Ok(PlaceholderSource::Uploaded(id))
    }

    /// Republish an article's content and record the edit on-chain.
    pub async fn edit(&self, target: &EditTarget, draft: &ArticleDraft) -> Result<EditedArticle> {
        let (manifest_id, manifest) = self.republish(&target.article_id, draft).await?;
        let action = DelegatedAction::edit_article(
            target.chain_id,
            target.original_author.clone(),
            draft.title.clone(),
            draft.category_id,
        );
        let outcome = self.submitter.submit(&action).await?;

        tracing::info!(
            article_id = %target.article_id,
            manifest_id = %manifest_id,
            tx_hash = %outcome.tx_hash,
            "Article edited"
        );
        Ok(EditedArticle {
            manifest_id,
            manifest,
            outcome,
        })
    }

    /// Upload a new manifest generation for `article_id`.
    ///
    /// Entries of the newest existing generation are kept unless the draft
    /// replaces them. The draft's cover replaces `cover`, its `n`-th image
    /// replaces `image-n`.
    pub async fn republish(
        &self,
        article_id: &str,
        draft: &ArticleDraft,
    ) -> Result<(String, ArticleManifest)> {
        let previous_id = self
            .source
            .latest_manifest_id(article_id)
            .await?
            .unwrap_or_else(|| article_id.to_string());
        let previous = self.source.fetch_manifest(&previous_id).await?;

        let assets = self.upload_assets(draft).await?;

        let (body, content_type) = match draft.visibility {
            Visibility::Public => (draft.body.clone(), MARKDOWN_CONTENT_TYPE),
            Visibility::Encrypted => {
                let key = self.keys.key_for(article_id).await?;
                (encrypt_article(&draft.body, &key)?, OPAQUE_CONTENT_TYPE)
            }
        };
        let content_id = self
            .upload(
                body.into_bytes(),
                vec![Tag::content_type(content_type), Tag::app_name()],
            )
            .await?;

        let manifest = with_assets(previous.with_entry(INDEX, content_id), assets);
        let manifest_id = self.upload_manifest(&manifest, Some(article_id)).await?;

        tracing::info!(
            article_id,
            previous_id = %previous_id,
            manifest_id = %manifest_id,
            "Uploaded new manifest generation"
        );
        Ok((manifest_id, manifest))
    }

    /// Upload cover and images; returns `(manifest path, id)` pairs, cover
    /// first.
    async fn upload_assets(&self, draft: &ArticleDraft) -> Result<Vec<(String, String)>> {
        let mut uploaded = Vec::new();
        if let Some(cover) = &draft.cover {
            uploaded.push((COVER.to_string(), self.upload_asset(cover).await?));
        }
        for (i, image) in draft.images.iter().enumerate() {
            uploaded.push((image_path(i + 1), self.upload_asset(image).await?));
        }
        Ok(uploaded)
    }

    async fn upload_asset(&self, asset: &Asset) -> Result<String> {
        match asset {
            Asset::Bytes { data, content_type } => {
                self.upload(
                    data.clone(),
                    vec![Tag::content_type(content_type.as_str()), Tag::app_name()],
                )
                .await
            }
            Asset::File(path) => {
                let bytes = tokio::fs::metadata(path)
                    .await
                    .map_err(crate::uploader::StorageNetworkError::from)?
                    .len();
                self.funding.ensure_storage(bytes).await?;
                let id = self.storage.upload_file(path, vec![Tag::app_name()]).await?;
                tracing::debug!(path = %path.display(), id = %id, bytes, "Uploaded file asset");
                Ok(id)
            }
        }
    }

    async fn upload_manifest(
        &self,
        manifest: &ArticleManifest,
        root: Option<&str>,
    ) -> Result<String> {
        let mut tags = vec![Tag::content_type(MANIFEST_CONTENT_TYPE), Tag::app_name()];
        if let Some(root) = root {
            tags.push(Tag::root_tx(root));
        }
        self.upload(manifest.to_json()?, tags).await
    }

    /// Fund the storage account if needed, then upload.
    async fn upload(&self, data: Vec<u8>, tags: Vec<Tag>) -> Result<String> {
        let bytes = data.len() as u64;
        self.funding.ensure_storage(bytes).await?;
        let id = self.storage.upload(data, tags).await?;
        tracing::debug!(id = %id, bytes, "Uploaded");
        Ok(id)
    }
}

fn with_assets(manifest: ArticleManifest, assets: Vec<(String, String)>) -> ArticleManifest {
    assets
        .into_iter()
        .fold(manifest, |m, (path, id)| m.with_entry(path, id))
}
