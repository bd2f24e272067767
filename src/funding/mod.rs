// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Balance/Funding Controller
//!
//! Keeps two balances solvent, lazily, right before the action that needs
//! them:
//!
//! - the session key's native balance, for gas plus any value it forwards
//! - the prepaid storage-network balance, for uploads above the free tier
//!
//! Funding is a single cycle: top up once, wait for confirmation, then
//! re-read the balance with exponential backoff to absorb propagation lag.
//! If the balance is still short the caller gets
//! [`Error::InsufficientFunds`](crate::error::Error::InsufficientFunds).

use std::sync::Arc;
use std::time::Duration;

use alloy::{
    primitives::{Address, U256},
    rpc::types::TransactionRequest,
};

use crate::blockchain::types::{format_balance, FeeEstimate, NATIVE_DECIMALS};
use crate::blockchain::{ChainClient, OwnerWallet};
use crate::config::FundingPolicy;
use crate::error::{Error, Result};
use crate::uploader::StorageNetwork;

/// Result of a funding check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundingOutcome {
    /// Balance already covered the requirement.
    Sufficient,
    /// A transfer or deposit was made and confirmed.
    Funded { amount: U256, reference: String },
    /// Below the free tier; nothing checked.
    Skipped,
}

/// `gas_units × max_fee × multiplier + pending_value`.
pub fn required_gas_balance(
    gas_units: u64,
    fee: &FeeEstimate,
    multiplier_pct: u64,
    pending_value: U256,
) -> U256 {
    apply_pct(fee.cost(gas_units), multiplier_pct) + pending_value
}

/// Amount moved per top-up: the configured default or the shortfall,
/// whichever is larger.
pub fn topup_amount(balance: U256, required: U256, default_topup: U256) -> U256 {
    required.saturating_sub(balance).max(default_topup)
}

fn apply_pct(amount: U256, pct: u64) -> U256 {
    amount * U256::from(pct) / U256::from(100u64)
}

pub struct FundingController {
    chain: Arc<dyn ChainClient>,
    wallet: Arc<dyn OwnerWallet>,
    storage: Arc<dyn StorageNetwork>,
    policy: FundingPolicy,
}

impl FundingController {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        wallet: Arc<dyn OwnerWallet>,
        storage: Arc<dyn StorageNetwork>,
        policy: FundingPolicy,
    ) -> Self {
        Self {
            chain,
            wallet,
            storage,
            policy,
        }
    }

    pub fn policy(&self) -> &FundingPolicy {
        &self.policy
    }

    /// Make sure `session` can pay for `gas_units` plus `pending_value`.
    pub async fn ensure_gas(
        &self,
        session: Address,
        gas_units: u64,
        pending_value: U256,
    ) -> Result<FundingOutcome> {
        let balance = self.chain.balance(session).await?;
        let fee = self.chain.fee_estimate().await?;
        let required = required_gas_balance(
            gas_units,
            &fee,
            self.policy.gas_safety_multiplier_pct,
            pending_value,
        );

        if balance >= required {
            return Ok(FundingOutcome::Sufficient);
        }

        let amount = topup_amount(balance, required, self.policy.default_gas_topup);
        tracing::info!(
            session_key = %session,
            balance = %format_balance(balance, NATIVE_DECIMALS),
            required = %format_balance(required, NATIVE_DECIMALS),
            amount = %format_balance(amount, NATIVE_DECIMALS),
            "Funding session key"
        );

        self.wallet.ensure_chain(self.chain.chain_id()).await?;
        let tx = TransactionRequest::default().to(session).value(amount);
        let tx_hash = self.wallet.send_transaction(tx).await?;
        self.chain
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|source| Error::AfterBroadcast { tx_hash, source })?;

        let chain = self.chain.clone();
        let settled = self
            .poll_until(required, || {
                let chain = chain.clone();
                async move { chain.balance(session).await.map_err(Error::from) }
            })
            .await?;

        match settled {
            Some(_) => Ok(FundingOutcome::Funded {
                amount,
                reference: tx_hash.to_string(),
            }),
            None => Err(Error::InsufficientFunds(format!(
                "session key {session} still below {} after funding transfer {tx_hash}",
                format_balance(required, NATIVE_DECIMALS)
            ))),
        }
    }

    /// Make sure the storage account can pay for uploading `bytes` bytes.
    pub async fn ensure_storage(&self, bytes: u64) -> Result<FundingOutcome> {
        if bytes <= self.policy.storage_free_tier_bytes {
            return Ok(FundingOutcome::Skipped);
        }

        let price = self.storage.price(bytes).await?;
        let required = apply_pct(price, self.policy.storage_balance_multiplier_pct);
        let balance = self.storage.balance().await?;

        if balance >= required {
            return Ok(FundingOutcome::Sufficient);
        }

        let amount = required - balance;
        tracing::info!(
            bytes,
            balance = %balance,
            required = %required,
            "Funding storage account"
        );
        let reference = self.storage.fund(amount).await?;

        let storage = self.storage.clone();
        let settled = self
            .poll_until(required, || {
                let storage = storage.clone();
                async move { storage.balance().await.map_err(Error::from) }
            })
            .await?;

        match settled {
            Some(_) => Ok(FundingOutcome::Funded { amount, reference }),
            None => Err(Error::InsufficientFunds(format!(
                "storage balance still below {required} after deposit {reference}"
            ))),
        }
    }

    /// Re-read a balance until it reaches `required` or retries run out.
    async fn poll_until<F, Fut>(&self, required: U256, mut read: F) -> Result<Option<U256>>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<U256>>,
    {
        let mut delay = self.policy.retry_backoff;
        for attempt in 0..=self.policy.balance_retries {
            let balance = read().await?;
            if balance >= required {
                return Ok(Some(balance));
            }
            if attempt < self.policy.balance_retries {
                tracing::debug!(attempt, balance = %balance, "Balance not settled yet");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2).min(Duration::from_secs(30));
            }
        }
        Ok(None)
    }
}
