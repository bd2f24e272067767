// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path manifest mapping article filenames to upload ids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const MANIFEST_KIND: &str = "arweave/paths";
pub const MANIFEST_VERSION: &str = "0.2.0";

/// Article body.
pub const INDEX: &str = "index";
pub const COVER: &str = "cover";

const IMAGE_PREFIX: &str = "image-";

/// Filename of the `n`-th content image (1-based).
pub fn image_path(n: usize) -> String {
    format!("{IMAGE_PREFIX}{n}")
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported manifest kind `{0}`")]
    UnsupportedKind(String),

    #[error("manifest has no `index` entry")]
    MissingIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IndexPath {
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PathEntry {
    id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleManifest {
    manifest: String,
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<IndexPath>,
    #[serde(default)]
    paths: BTreeMap<String, PathEntry>,
}

impl Default for ArticleManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleManifest {
    pub fn new() -> Self {
        Self {
            manifest: MANIFEST_KIND.to_string(),
            version: MANIFEST_VERSION.to_string(),
            index: Some(IndexPath {
                path: INDEX.to_string(),
            }),
            paths: BTreeMap::new(),
        }
    }

    /// Set `path` to `id`, replacing any previous entry.
    pub fn with_entry(mut self, path: impl Into<String>, id: impl Into<String>) -> Self {
        self.paths.insert(path.into(), PathEntry { id: id.into() });
        self
    }

    pub fn entry(&self, path: &str) -> Option<&str> {
        self.paths.get(path).map(|e| e.id.as_str())
    }

    pub fn index(&self) -> Option<&str> {
        let path = self.index.as_ref().map_or(INDEX, |i| i.path.as_str());
        self.entry(path)
    }

    pub fn cover(&self) -> Option<&str> {
        self.entry(COVER)
    }

    /// Content images as `(n, id)`, in numeric order.
    pub fn images(&self) -> Vec<(usize, &str)> {
        let mut images: Vec<_> = self
            .paths
            .iter()
            .filter_map(|(path, entry)| {
                let n = path.strip_prefix(IMAGE_PREFIX)?.parse().ok()?;
                Some((n, entry.id.as_str()))
            })
            .collect();
        images.sort_by_key(|(n, _)| *n);
        images
    }

    pub fn paths(&self) -> impl Iterator<Item = (&str, &str)> {
        self.paths.iter().map(|(p, e)| (p.as_str(), e.id.as_str()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ManifestError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        if manifest.manifest != MANIFEST_KIND {
            return Err(ManifestError::UnsupportedKind(manifest.manifest));
        }
        Ok(manifest)
    }
}
