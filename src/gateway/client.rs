// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP gateway client with a manifest cache.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use super::{with_fallback, ContentSource, GatewayError};
use crate::publish::ArticleManifest;
use crate::uploader::ROOT_TX_TAG;

/// Manifests kept in memory. Manifests are immutable by id.
const MANIFEST_CACHE_CAPACITY: usize = 256;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const LATEST_MANIFEST_QUERY: &str = r#"query LatestManifest($root: String!, $owners: [String!]) {
  transactions(
    tags: [{ name: "Root-TX", values: [$root] }]
    owners: $owners
    sort: HEIGHT_DESC
    first: 1
  ) {
    edges { node { id } }
  }
}"#;

pub struct GatewayClient {
    http: Client,
    gateways: Vec<Url>,
    manifests: Mutex<LruCache<String, ArticleManifest>>,
    /// Only manifests uploaded by these accounts count as updates.
    trusted_uploaders: Vec<String>,
}

impl GatewayClient {
    pub fn new(gateways: Vec<Url>) -> Result<Self, GatewayError> {
        if gateways.is_empty() {
            return Err(GatewayError::NoGateways);
        }
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            gateways,
            manifests: Mutex::new(LruCache::new(
                NonZeroUsize::new(MANIFEST_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            trusted_uploaders: Vec::new(),
        })
    }

    pub fn with_trusted_uploaders(mut self, uploaders: Vec<String>) -> Self {
        self.trusted_uploaders = uploaders;
        self
    }

    pub fn gateways(&self) -> &[Url] {
        &self.gateways
    }

    fn cached_manifest(&self, id: &str) -> Option<ArticleManifest> {
        let mut cache = self.manifests.lock().ok()?;
        cache.get(id).cloned()
    }

    fn cache_manifest(&self, id: &str, manifest: &ArticleManifest) {
        if let Ok(mut cache) = self.manifests.lock() {
            cache.put(id.to_string(), manifest.clone());
        }
    }

    async fn get_raw(&self, gateway: Url, id: &str) -> Result<Vec<u8>, GatewayError> {
        let url = gateway.join(&format!("raw/{id}"))?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                gateway: gateway.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;
        Ok(body.to_vec())
    }

    async fn query_latest(&self, gateway: Url, root_id: &str) -> Result<Option<String>, GatewayError> {
        let url = gateway.join("graphql")?;
        let owners = if self.trusted_uploaders.is_empty() {
            Value::Null
        } else {
            json!(self.trusted_uploaders)
        };
        let payload = json!({
            "query": LATEST_MANIFEST_QUERY,
            "variables": { "root": root_id, "owners": owners },
        });

        let response = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                gateway: gateway.to_string(),
                status: status.as_u16(),
            });
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        if let Some(errors) = body.get("errors") {
            return Err(GatewayError::Decode(format!("graphql errors: {errors}")));
        }
        let edges = body
            .pointer("/data/transactions/edges")
            .and_then(Value::as_array)
            .ok_or_else(|| GatewayError::Decode("missing transactions.edges".to_string()))?;

        Ok(edges
            .first()
            .and_then(|edge| edge.pointer("/node/id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

#[async_trait]
impl ContentSource for GatewayClient {
    async fn fetch(&self, id: &str) -> Result<Vec<u8>, GatewayError> {
        with_fallback(&self.gateways, |gateway| self.get_raw(gateway, id)).await
    }

    async fn latest_manifest_id(&self, root_id: &str) -> Result<Option<String>, GatewayError> {
        let latest =
            with_fallback(&self.gateways, |gateway| self.query_latest(gateway, root_id)).await?;
        tracing::debug!(root_id, latest = ?latest, tag = ROOT_TX_TAG, "Resolved latest manifest");
        Ok(latest)
    }

    async fn fetch_manifest(&self, id: &str) -> Result<ArticleManifest, GatewayError> {
        if let Some(manifest) = self.cached_manifest(id) {
            return Ok(manifest);
        }
        let bytes = self.fetch(id).await?;
        let manifest = ArticleManifest::from_json(&bytes)?;
        self.cache_manifest(id, &manifest);
        Ok(manifest)
    }
}
