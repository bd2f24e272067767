// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Owner wallet capability.
//!
//! The owner's key never enters this crate. Every owner action goes through
//! [`OwnerWallet`], which may prompt the user and may be rejected.

use alloy::{
    dyn_abi::TypedData,
    network::Ethereum,
    primitives::{Address, Bytes, TxHash},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use url::Url;

use super::error::{classify, ChainError};

type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Injected owner wallet (browser extension bridge, hardware wallet, ...).
#[async_trait]
pub trait OwnerWallet: Send + Sync {
    /// Accounts the wallet exposes, primary first.
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError>;

    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// EIP-191 `personal_sign` over a UTF-8 message. One prompt.
    async fn sign_message(&self, message: &str) -> Result<Bytes, ChainError>;

    /// EIP-712 `eth_signTypedData_v4`. One prompt.
    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, ChainError>;

    /// Sign and broadcast an owner transaction. One prompt.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ChainError>;

    /// Fail unless the wallet is connected to `expected`.
    async fn ensure_chain(&self, expected: u64) -> Result<(), ChainError> {
        let actual = self.chain_id().await?;
        if actual != expected {
            tracing::warn!(expected, actual, "Owner wallet on the wrong chain");
            return Err(ChainError::WrongChain { expected, actual });
        }
        Ok(())
    }

    /// Primary account.
    async fn owner(&self) -> Result<Address, ChainError> {
        self.request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(ChainError::NoAccount)
    }
}

/// [`OwnerWallet`] backed by a JSON-RPC endpoint that holds the owner key
/// (a wallet bridge or a development node with unlocked accounts).
pub struct RpcOwnerWallet {
    provider: HttpProvider,
}

impl RpcOwnerWallet {
    pub fn new(url: Url) -> Self {
        Self {
            provider: ProviderBuilder::new().connect_http(url),
        }
    }
}

#[async_trait]
impl OwnerWallet for RpcOwnerWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
        self.provider.get_accounts().await.map_err(classify)
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider.get_chain_id().await.map_err(classify)
    }

    async fn sign_message(&self, message: &str) -> Result<Bytes, ChainError> {
        let owner = self.owner().await?;
        let payload = format!("0x{}", alloy::hex::encode(message.as_bytes()));

        self.provider
            .raw_request::<_, Bytes>("personal_sign".into(), (payload, owner))
            .await
            .map_err(classify)
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, ChainError> {
        let owner = self.owner().await?;
        let payload =
            serde_json::to_string(typed_data).map_err(|e| ChainError::Abi(e.to_string()))?;

        self.provider
            .raw_request::<_, Bytes>("eth_signTypedData_v4".into(), (owner, payload))
            .await
            .map_err(classify)
    }

    async fn send_transaction(&self, mut tx: TransactionRequest) -> Result<TxHash, ChainError> {
        if tx.from.is_none() {
            tx.from = Some(self.owner().await?);
        }

        let hash = self
            .provider
            .raw_request::<_, TxHash>("eth_sendTransaction".into(), (tx,))
            .await
            .map_err(classify)?;

        tracing::debug!(tx_hash = %hash, "Owner transaction broadcast");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::signing::recover_signer;
    use crate::testing::{MockWallet, TEST_CHAIN_ID};
    use serde_json::json;

    fn follow_typed_data() -> TypedData {
        serde_json::from_value(json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "chainId", "type": "uint256" }
                ],
                "Follow": [{ "name": "target", "type": "address" }]
            },
            "primaryType": "Follow",
            "domain": { "name": "chainpress", "chainId": "0xa869" },
            "message": { "target": "0x7777777777777777777777777777777777777777" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn typed_data_signature_recovers_to_the_owner() {
        let wallet = MockWallet::new();
        let typed = follow_typed_data();

        let signature = wallet.sign_typed_data(&typed).await.unwrap();
        let hash = typed.eip712_signing_hash().unwrap();
        assert_eq!(recover_signer(&hash, &signature).unwrap(), wallet.address());
        assert_eq!(wallet.sign_prompts(), 1);
    }

    #[tokio::test]
    async fn chain_mismatch_is_reported() {
        let wallet = MockWallet::new();
        wallet.ensure_chain(TEST_CHAIN_ID).await.unwrap();

        wallet.switch_chain(1);
        let err = wallet.ensure_chain(TEST_CHAIN_ID).await.unwrap_err();
        assert!(matches!(
            err,
            ChainError::WrongChain { expected: TEST_CHAIN_ID, actual: 1 }
        ));
    }
}
