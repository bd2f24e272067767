// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, policy defaults, and the [`AppConfig`] loaded
//! from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CHAINPRESS_ENV` | Deployment environment (`mainnet` or `testnet`) | `testnet` |
//! | `RPC_URL` | JSON-RPC endpoint for chain reads and session-key sends | Network preset |
//! | `WALLET_RPC_URL` | JSON-RPC endpoint holding the owner account | Required for writes |
//! | `SESSION_MANAGER_ADDRESS` | Session key authorization contract | Required |
//! | `BLOG_CONTRACT_ADDRESS` | Blog contract (delegated call target) | Required |
//! | `GATEWAY_URLS` | Comma-separated storage gateways, in preference order | `https://arweave.net,https://ar-io.net,https://g8way.io` |
//! | `SESSION_SPENDING_LIMIT` | Native value a session key may move, in whole tokens (`0.1`) | `0.1` |
//! | `RECEIPT_TIMEOUT_SECS` | Give up waiting for a transaction receipt after this long | unbounded |
//! | `DATA_DIR` | Directory for the local state database | `.chainpress` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::blockchain::types::{
    parse_amount, NetworkConfig, AVAX_FUJI, AVAX_MAINNET, NATIVE_DECIMALS,
};

pub const ENV_ENV: &str = "CHAINPRESS_ENV";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const WALLET_RPC_URL_ENV: &str = "WALLET_RPC_URL";
pub const SESSION_MANAGER_ENV: &str = "SESSION_MANAGER_ADDRESS";
pub const BLOG_CONTRACT_ENV: &str = "BLOG_CONTRACT_ADDRESS";
pub const GATEWAY_URLS_ENV: &str = "GATEWAY_URLS";
pub const SPENDING_LIMIT_ENV: &str = "SESSION_SPENDING_LIMIT";
pub const RECEIPT_TIMEOUT_ENV: &str = "RECEIPT_TIMEOUT_SECS";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Gateways queried when `GATEWAY_URLS` is unset, most preferred first.
pub const DEFAULT_GATEWAYS: &[&str] = &[
    "https://arweave.net",
    "https://ar-io.net",
    "https://g8way.io",
];

pub const DEFAULT_DATA_DIR: &str = ".chainpress";

/// Deployment environment. Scopes every local record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mainnet,
    Testnet,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Mainnet => "mainnet",
            Environment::Testnet => "testnet",
        }
    }

    /// Chain preset for this environment.
    pub fn network(&self) -> NetworkConfig {
        match self {
            Environment::Mainnet => AVAX_MAINNET,
            Environment::Testnet => AVAX_FUJI,
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "production" => Ok(Environment::Mainnet),
            "testnet" | "fuji" | "development" => Ok(Environment::Testnet),
            other => Err(ConfigError::Invalid {
                name: ENV_ENV,
                reason: format!("unknown environment `{other}`"),
            }),
        }
    }
}

/// Limits granted to a session key at registration.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Validity window length from the registration block.
    pub validity: Duration,
    /// Total native value the key may move on the owner's behalf.
    pub spending_limit: U256,
    /// How long a delegated-call signature stays valid after signing.
    pub deadline_horizon: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            validity: Duration::from_secs(7 * 24 * 60 * 60),
            // 0.1 native token
            spending_limit: U256::from(100_000_000_000_000_000u128),
            deadline_horizon: Duration::from_secs(5 * 60),
        }
    }
}

/// Thresholds for the gas and storage funding loops.
#[derive(Debug, Clone)]
pub struct FundingPolicy {
    /// Gas requirement multiplier in percent (150 = 1.5x).
    pub gas_safety_multiplier_pct: u64,
    /// Minimum amount moved to a session key per top-up.
    pub default_gas_topup: U256,
    /// Uploads up to this size are free on the storage network.
    pub storage_free_tier_bytes: u64,
    /// Required prepaid storage balance relative to the upload price, in percent.
    pub storage_balance_multiplier_pct: u64,
    /// Balance re-reads after a funding transfer confirms.
    pub balance_retries: u32,
    /// First re-read delay; doubles on every attempt.
    pub retry_backoff: Duration,
}

impl Default for FundingPolicy {
    fn default() -> Self {
        Self {
            gas_safety_multiplier_pct: 150,
            // 0.01 native token
            default_gas_topup: U256::from(10_000_000_000_000_000u128),
            storage_free_tier_bytes: 100 * 1024,
            storage_balance_multiplier_pct: 120,
            balance_retries: 5,
            retry_backoff: Duration::from_millis(750),
        }
    }
}

/// Logging output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Full runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub network: NetworkConfig,
    pub rpc_url: Url,
    pub wallet_rpc_url: Option<Url>,
    pub session_manager: Address,
    pub blog_contract: Address,
    pub gateways: Vec<Url>,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    /// `None` waits for receipts until the provider fails.
    pub receipt_timeout: Option<Duration>,
    pub session: SessionPolicy,
    pub funding: FundingPolicy,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup(ENV_ENV) {
            Some(raw) => raw.parse()?,
            None => Environment::Testnet,
        };
        let network = environment.network();

        let rpc_url = parse_url(
            RPC_URL_ENV,
            &lookup(RPC_URL_ENV).unwrap_or_else(|| network.rpc_url.to_string()),
        )?;
        let wallet_rpc_url = lookup(WALLET_RPC_URL_ENV)
            .map(|raw| parse_url(WALLET_RPC_URL_ENV, &raw))
            .transpose()?;

        let session_manager = parse_address(SESSION_MANAGER_ENV, lookup(SESSION_MANAGER_ENV))?;
        let blog_contract = parse_address(BLOG_CONTRACT_ENV, lookup(BLOG_CONTRACT_ENV))?;

        let gateways = match lookup(GATEWAY_URLS_ENV) {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_gateway)
                .collect::<Result<Vec<_>, _>>()?,
            None => DEFAULT_GATEWAYS
                .iter()
                .copied()
                .map(parse_gateway)
                .collect::<Result<Vec<_>, _>>()?,
        };
        if gateways.is_empty() {
            return Err(ConfigError::Invalid {
                name: GATEWAY_URLS_ENV,
                reason: "at least one gateway is required".to_string(),
            });
        }

        let mut session = SessionPolicy::default();
        if let Some(raw) = lookup(SPENDING_LIMIT_ENV) {
            session.spending_limit =
                parse_amount(&raw, NATIVE_DECIMALS).map_err(|e| ConfigError::Invalid {
                    name: SPENDING_LIMIT_ENV,
                    reason: e.to_string(),
                })?;
        }

        let receipt_timeout = lookup(RECEIPT_TIMEOUT_ENV)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| ConfigError::Invalid {
                        name: RECEIPT_TIMEOUT_ENV,
                        reason: e.to_string(),
                    })
            })
            .transpose()?;

        let data_dir = PathBuf::from(
            lookup(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            environment,
            network,
            rpc_url,
            wallet_rpc_url,
            session_manager,
            blog_contract,
            gateways,
            data_dir,
            log_format,
            receipt_timeout,
            session,
            funding: FundingPolicy::default(),
        })
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e: url::ParseError| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

/// Gateway base URL; always ends in `/` so `Url::join` keeps any path
/// prefix.
fn parse_gateway(raw: &str) -> Result<Url, ConfigError> {
    let mut url = parse_url(GATEWAY_URLS_ENV, raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_address(name: &'static str, raw: Option<String>) -> Result<Address, ConfigError> {
    let raw = raw.ok_or(ConfigError::Missing(name))?;
    Address::from_str(raw.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
