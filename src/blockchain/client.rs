// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain read/write client used by the session and funding layers.

use std::time::Duration;

use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, EthereumWallet},
    primitives::{Address, TxHash, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use tokio::time::Instant;
use url::Url;

use super::contract::ISessionKeyManager;
use super::error::{classify, classify_contract, ChainError};
use super::types::{FeeEstimate, NetworkConfig, SessionKeyRecord, TxReceipt};
use crate::config::AppConfig;

/// Receipt polling cadence.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Chain operations the protocol depends on.
///
/// Every call is a suspension point; implementations classify raw provider
/// failures into [`ChainError`] before returning.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Timestamp of the latest block. Session validity is judged against
    /// this, never wall-clock time.
    async fn block_timestamp(&self) -> Result<u64, ChainError>;

    async fn balance(&self, address: Address) -> Result<U256, ChainError>;

    async fn fee_estimate(&self) -> Result<FeeEstimate, ChainError>;

    /// On-chain record for `(owner, session_key)`; `None` if never registered
    /// or already revoked.
    async fn session_key_record(
        &self,
        owner: Address,
        session_key: Address,
    ) -> Result<Option<SessionKeyRecord>, ChainError>;

    /// Sign `tx` with `signer` and broadcast it. Returns once the node has
    /// accepted the transaction.
    async fn send_as(
        &self,
        signer: &PrivateKeySigner,
        tx: TransactionRequest,
    ) -> Result<TxHash, ChainError>;

    /// Block until `hash` is mined. A reverted transaction is an error.
    /// Implementations impose no deadline unless configured with one.
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, ChainError>;
}

/// [`ChainClient`] over an HTTP JSON-RPC endpoint.
pub struct AlloyChainClient {
    network: NetworkConfig,
    rpc_url: Url,
    session_manager: Address,
    provider: HttpProvider,
    /// `None` waits until the receipt shows up or the provider fails.
    receipt_timeout: Option<Duration>,
}

impl AlloyChainClient {
    pub fn new(network: NetworkConfig, rpc_url: Url, session_manager: Address) -> Self {
        let provider = ProviderBuilder::new().connect_http(rpc_url.clone());
        Self {
            network,
            rpc_url,
            session_manager,
            provider,
            receipt_timeout: None,
        }
    }

    /// Client for the chain described by `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.network.clone(),
            config.rpc_url.clone(),
            config.session_manager,
        )
        .with_receipt_timeout(config.receipt_timeout)
    }

    pub fn with_receipt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receipt_timeout = timeout;
        self
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn chain_id(&self) -> u64 {
        self.network.chain_id
    }

    async fn block_timestamp(&self) -> Result<u64, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(classify)?
            .ok_or_else(|| ChainError::Rpc("No latest block".to_string()))?;
        Ok(block.header.timestamp)
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        self.provider.get_balance(address).await.map_err(classify)
    }

    async fn fee_estimate(&self) -> Result<FeeEstimate, ChainError> {
        match self.provider.estimate_eip1559_fees().await {
            Ok(fees) => Ok(FeeEstimate::eip1559(
                fees.max_fee_per_gas,
                fees.max_priority_fee_per_gas,
            )),
            Err(e) => {
                tracing::debug!(error = %e, "EIP-1559 fee estimation unavailable, using gas price");
                let gas_price = self.provider.get_gas_price().await.map_err(classify)?;
                Ok(FeeEstimate::legacy(gas_price))
            }
        }
    }

    async fn session_key_record(
        &self,
        owner: Address,
        session_key: Address,
    ) -> Result<Option<SessionKeyRecord>, ChainError> {
        let manager = ISessionKeyManager::new(self.session_manager, &self.provider);
        let data = manager
            .getSessionKeyData(owner, session_key)
            .call()
            .await
            .map_err(classify_contract)?;

        let record = SessionKeyRecord::from(data);
        Ok(record.is_registered().then_some(record))
    }

    async fn send_as(
        &self,
        signer: &PrivateKeySigner,
        tx: TransactionRequest,
    ) -> Result<TxHash, ChainError> {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_http(self.rpc_url.clone());

        let pending = provider.send_transaction(tx).await.map_err(classify)?;
        let tx_hash = *pending.tx_hash();

        tracing::debug!(
            from = %signer.address(),
            tx_hash = %tx_hash,
            explorer = %self.network.tx_url(&tx_hash),
            "Transaction broadcast"
        );
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, ChainError> {
        let deadline = self.receipt_timeout.map(|t| Instant::now() + t);
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(classify)?;

            if let Some(receipt) = receipt {
                let receipt = TxReceipt {
                    tx_hash: hash,
                    block_number: receipt.block_number.unwrap_or(0),
                    gas_used: receipt.gas_used,
                    success: receipt.status(),
                };
                if !receipt.success {
                    return Err(ChainError::TransactionFailed(hash));
                }
                return Ok(receipt);
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(tx_hash = %hash, "Gave up waiting for receipt");
                return Err(ChainError::ReceiptTimeout(hash));
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}
