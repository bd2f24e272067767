// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Article Publishing
//!
//! An article is a path manifest on the storage network (`index` body,
//! optional `cover`, numbered content images). The id of the first
//! manifest is the article's permanent address; later versions are new
//! manifests tagged `Root-TX = <permanent id>` and the newest one wins.
//!
//! ## Encrypted Articles
//!
//! The article key is derived from a signature over the permanent id, which
//! only exists once a manifest has been uploaded. Publishing is therefore
//! two-phase:
//!
//! 1. upload assets, then an initial manifest whose `index` points at a
//!    placeholder (a reused asset, or a shared placeholder text)
//! 2. derive the key from the initial manifest id, upload the encrypted
//!    body, and upload an updated manifest tagged with `Root-TX`

pub mod manifest;
pub mod publisher;
pub mod reader;

use std::path::PathBuf;

pub use manifest::{image_path, ArticleManifest, ManifestError, COVER, INDEX};
pub use publisher::{
    EditTarget, EditedArticle, PlaceholderSource, PublishedArticle, Publisher, UploadedArticle,
};
pub use reader::{ArticleBody, ArticleReader, ResolvedArticle};

use crate::blockchain::Visibility;

/// Non-text file attached to an article.
#[derive(Debug, Clone)]
pub enum Asset {
    Bytes { data: Vec<u8>, content_type: String },
    File(PathBuf),
}

impl Asset {
    pub fn bytes(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Asset::Bytes {
            data,
            content_type: content_type.into(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Asset::File(path.into())
    }
}

/// Article as composed by the author.
#[derive(Debug, Clone)]
pub struct ArticleDraft {
    pub title: String,
    /// Markdown body.
    pub body: String,
    pub category_id: u64,
    pub royalty_bps: u16,
    pub visibility: Visibility,
    pub cover: Option<Asset>,
    /// Content images; the `n`-th becomes `image-n`.
    pub images: Vec<Asset>,
}

impl ArticleDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            category_id: 0,
            royalty_bps: 0,
            visibility: Visibility::Public,
            cover: None,
            images: Vec::new(),
        }
    }

    pub fn encrypted(mut self) -> Self {
        self.visibility = Visibility::Encrypted;
        self
    }

    pub fn with_cover(mut self, cover: Asset) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn with_image(mut self, image: Asset) -> Self {
        self.images.push(image);
        self
    }

    pub fn with_category(mut self, category_id: u64) -> Self {
        self.category_id = category_id;
        self
    }
}
