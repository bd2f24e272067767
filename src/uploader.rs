// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage network write capability.
//!
//! Uploads return the content-address id assigned by the network. Tags are
//! attached verbatim and drive both content negotiation (`Content-Type`) and
//! the mutable-folder chain (`Root-TX`).

use std::path::Path;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const CONTENT_TYPE_TAG: &str = "Content-Type";
pub const ROOT_TX_TAG: &str = "Root-TX";
pub const APP_NAME_TAG: &str = "App-Name";

pub const APP_NAME: &str = "chainpress";

pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown";
pub const OPAQUE_CONTENT_TYPE: &str = "application/octet-stream";
pub const MANIFEST_CONTENT_TYPE: &str = "application/x.arweave-manifest+json";

/// A name/value transaction tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn content_type(value: impl Into<String>) -> Self {
        Self::new(CONTENT_TYPE_TAG, value)
    }

    /// Back-reference from a manifest revision to the article's permanent id.
    pub fn root_tx(root_id: impl Into<String>) -> Self {
        Self::new(ROOT_TX_TAG, root_id)
    }

    pub fn app_name() -> Self {
        Self::new(APP_NAME_TAG, APP_NAME)
    }
}

/// Find a tag value by name.
pub fn tag_value<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.name == name)
        .map(|t| t.value.as_str())
}

/// Guess a content type from a file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("md" | "markdown") => MARKDOWN_CONTENT_TYPE,
        _ => OPAQUE_CONTENT_TYPE,
    }
}

/// Errors from the storage network.
#[derive(Debug, thiserror::Error)]
pub enum StorageNetworkError {
    #[error("storage network unreachable: {0}")]
    Transport(String),

    #[error("upload rejected: {0}")]
    Rejected(String),

    #[error("storage deposit rejected by user")]
    UserRejected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upload and account operations on the storage network.
#[async_trait]
pub trait StorageNetwork: Send + Sync {
    async fn upload(&self, data: Vec<u8>, tags: Vec<Tag>) -> Result<String, StorageNetworkError>;

    /// Upload a file from disk with its content type inferred.
    async fn upload_file(&self, path: &Path, mut tags: Vec<Tag>) -> Result<String, StorageNetworkError> {
        let data = tokio::fs::read(path).await?;
        if tag_value(&tags, CONTENT_TYPE_TAG).is_none() {
            tags.push(Tag::content_type(content_type_for(path)));
        }
        self.upload(data, tags).await
    }

    /// Price of storing `bytes` bytes, in the network's base unit.
    async fn price(&self, bytes: u64) -> Result<U256, StorageNetworkError>;

    /// Prepaid balance of the uploading account.
    async fn balance(&self) -> Result<U256, StorageNetworkError>;

    /// Deposit `amount` into the uploading account; returns the deposit id.
    async fn fund(&self, amount: U256) -> Result<String, StorageNetworkError>;
}
