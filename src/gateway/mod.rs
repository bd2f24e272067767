// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Gateway Fetch Layer
//!
//! Read access to the storage network through a list of mirror gateways
//! serving identical content. Gateways are always tried in the configured
//! order; any transport failure or non-2xx status moves on to the next one.

pub mod client;
pub mod fallback;

use async_trait::async_trait;

pub use client::GatewayClient;
pub use fallback::with_fallback;

use crate::publish::{ArticleManifest, ManifestError};

/// Errors from gateway reads.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no gateways configured")]
    NoGateways,

    #[error("gateway {gateway} returned HTTP {status}")]
    Status { gateway: String, status: u16 },

    #[error("gateway request failed: {0}")]
    Http(String),

    #[error("unexpected gateway response: {0}")]
    Decode(String),

    #[error("invalid gateway URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid manifest: {0}")]
    InvalidManifest(#[from] ManifestError),

    #[error("all {attempts} gateways failed, last error: {last}")]
    AllFailed {
        attempts: usize,
        last: Box<GatewayError>,
    },
}

/// Read side of the storage network.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Raw bytes stored under `id`.
    async fn fetch(&self, id: &str) -> Result<Vec<u8>, GatewayError>;

    /// Newest manifest tagged `Root-TX = root_id`, if any update exists.
    async fn latest_manifest_id(&self, root_id: &str) -> Result<Option<String>, GatewayError>;

    async fn fetch_manifest(&self, id: &str) -> Result<ArticleManifest, GatewayError> {
        let bytes = self.fetch(id).await?;
        Ok(ArticleManifest::from_json(&bytes)?)
    }
}
