// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session key lifecycle: create, validate, reauthorize, revoke.

use std::sync::Arc;

use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use chrono::Utc;

use super::record::{Invalidity, SessionKey, SessionState};
use super::UnavailableReason;
use crate::blockchain::actions::{ActionKind, DELEGATION_GAS_OVERHEAD};
use crate::blockchain::contract::ISessionKeyManager;
use crate::blockchain::signing::{generate_session_signer, signer_to_hex};
use crate::blockchain::types::{FeeKind, Selector, SessionKeyRecord};
use crate::blockchain::{ChainClient, OwnerWallet};
use crate::config::{Environment, SessionPolicy};
use crate::error::{Error, Result};
use crate::funding::FundingController;
use crate::storage::{keys, read_json, write_json, KeyValueStore};

/// Gas of a plain native transfer.
const TRANSFER_GAS: u64 = 21_000;

/// Gas budget used when a selector has no known action.
const DEFAULT_DELEGATED_GAS: u64 = 300_000;

/// A session key that passed on-chain validation and funding.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub key: SessionKey,
    pub signer: PrivateKeySigner,
    pub record: SessionKeyRecord,
}

impl ActiveSession {
    pub fn owner(&self) -> Address {
        self.key.owner
    }

    pub fn address(&self) -> Address {
        self.key.address
    }
}

/// Answer of [`SessionKeyManager::ensure_ready`].
#[derive(Debug, Clone)]
pub enum Readiness {
    Ready(ActiveSession),
    /// The caller should fall back to a direct owner-signed call.
    Unavailable(UnavailableReason),
}

/// What an explicit revoke did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevokeOutcome {
    /// Native value returned to the owner before revoking.
    pub swept: U256,
    pub sweep_tx: Option<TxHash>,
    pub revoke_tx: Option<TxHash>,
}

/// Owns the session key of the connected owner in one environment.
pub struct SessionKeyManager {
    environment: Environment,
    session_manager: Address,
    target: Address,
    granted: Vec<Selector>,
    policy: SessionPolicy,
    chain: Arc<dyn ChainClient>,
    wallet: Arc<dyn OwnerWallet>,
    store: Arc<dyn KeyValueStore>,
    funding: Arc<FundingController>,
}

impl SessionKeyManager {
    /// Manager granting every delegatable blog action on `target`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        environment: Environment,
        session_manager: Address,
        target: Address,
        policy: SessionPolicy,
        chain: Arc<dyn ChainClient>,
        wallet: Arc<dyn OwnerWallet>,
        store: Arc<dyn KeyValueStore>,
        funding: Arc<FundingController>,
    ) -> Self {
        Self {
            environment,
            session_manager,
            target,
            granted: ActionKind::ALL.iter().map(|k| k.selector()).collect(),
            policy,
            chain,
            wallet,
            store,
            funding,
        }
    }

    /// Restrict the selectors requested at registration.
    pub fn with_selectors(mut self, selectors: Vec<Selector>) -> Self {
        self.granted = selectors;
        self
    }

    pub fn target(&self) -> Address {
        self.target
    }

    /// Produce a key that is registered, valid for `selector` and
    /// `pending_value` on-chain, and funded; or report why none can be.
    pub async fn ensure_ready(&self, selector: Selector, pending_value: U256) -> Result<Readiness> {
        if !self.granted.contains(&selector) {
            return Ok(Readiness::Unavailable(UnavailableReason::SelectorNotGranted(
                selector,
            )));
        }
        if pending_value > self.policy.spending_limit {
            return Ok(Readiness::Unavailable(UnavailableReason::ExceedsPolicyLimit {
                requested: pending_value,
                limit: self.policy.spending_limit,
            }));
        }

        let owner = self.wallet.owner().await?;
        let now = self.chain.block_timestamp().await?;

        let key = match self.stored(owner)? {
            None => self.create(owner, now).await?,
            Some(key) => {
                let record = self.chain.session_key_record(owner, key.address).await?;
                let verdict = match &record {
                    Some(r) => r.check(self.target, selector, now, pending_value),
                    None => Err(Invalidity::NotRegistered),
                };

                match verdict {
                    Ok(()) => key,
                    Err(invalidity) => {
                        self.recover(owner, key, record.as_ref(), invalidity, now)
                            .await?
                    }
                }
            }
        };

        // Never trust the local copy; re-read what the chain now says.
        let record = self.chain.session_key_record(owner, key.address).await?;
        let verdict = match &record {
            Some(r) => r.check(self.target, selector, now, pending_value),
            None => Err(Invalidity::NotRegistered),
        };
        let record = match (verdict, record) {
            (Ok(()), Some(record)) => record,
            (Err(invalidity), _) => {
                tracing::warn!(
                    owner = %owner,
                    session_key = %key.address,
                    reason = %invalidity,
                    "Session key unusable after registration"
                );
                return Ok(Readiness::Unavailable(UnavailableReason::StillInvalid(
                    invalidity,
                )));
            }
            (Ok(()), None) => {
                return Ok(Readiness::Unavailable(UnavailableReason::StillInvalid(
                    Invalidity::NotRegistered,
                )))
            }
        };

        let gas_units = ActionKind::from_selector(selector)
            .map(|k| k.base_gas() + DELEGATION_GAS_OVERHEAD)
            .unwrap_or(DEFAULT_DELEGATED_GAS);
        self.funding
            .ensure_gas(key.address, gas_units, pending_value)
            .await?;

        let signer = key.signer()?;
        Ok(Readiness::Ready(ActiveSession {
            key,
            signer,
            record,
        }))
    }

    /// Bring an invalid key back to life without stranding its balance.
    async fn recover(
        &self,
        owner: Address,
        key: SessionKey,
        record: Option<&SessionKeyRecord>,
        invalidity: Invalidity,
        now: u64,
    ) -> Result<SessionKey> {
        let balance = self.chain.balance(key.address).await?;
        tracing::info!(
            owner = %owner,
            session_key = %key.address,
            reason = %invalidity,
            balance = %balance,
            "Stored session key is not usable"
        );

        if balance.is_zero() {
            // Nothing to strand; retire the address for good.
            if record.is_some() {
                self.revoke_on_chain(key.address).await?;
            }
            self.store
                .delete(&keys::session_key(self.environment, &owner))?;
            return self.create(owner, now).await;
        }

        self.reauthorize(owner, key, record, now).await
    }

    /// Generate a keypair, register it, and persist it once confirmed.
    pub async fn create(&self, owner: Address, now: u64) -> Result<SessionKey> {
        let signer = generate_session_signer();
        let valid_until = now + self.policy.validity.as_secs();

        self.register(signer.address(), now, valid_until).await?;

        let key = SessionKey {
            address: signer.address(),
            private_key: signer_to_hex(&signer),
            owner,
            valid_until,
            created_at: Utc::now(),
        };
        self.persist(&key)?;

        tracing::info!(
            owner = %owner,
            session_key = %key.address,
            valid_until,
            env = self.environment.as_str(),
            "Session key registered"
        );
        Ok(key)
    }

    /// Re-register the same address with a fresh window.
    ///
    /// The contract refuses to register over a time-valid record, so a key
    /// that is invalid for another reason is revoked first.
    pub async fn reauthorize(
        &self,
        owner: Address,
        mut key: SessionKey,
        record: Option<&SessionKeyRecord>,
        now: u64,
    ) -> Result<SessionKey> {
        if record.is_some_and(|r| r.is_time_valid(now)) {
            self.revoke_on_chain(key.address).await?;
        }

        let valid_until = now + self.policy.validity.as_secs();
        self.register(key.address, now, valid_until).await?;

        key.valid_until = valid_until;
        self.persist(&key)?;

        tracing::info!(
            owner = %owner,
            session_key = %key.address,
            valid_until,
            "Session key reauthorized"
        );
        Ok(key)
    }

    /// Sweep the key's balance back to the owner, revoke it on-chain, and
    /// delete the local record.
    pub async fn revoke(&self) -> Result<RevokeOutcome> {
        let owner = self.wallet.owner().await?;
        let Some(key) = self.stored(owner)? else {
            return Ok(RevokeOutcome::default());
        };

        let mut outcome = RevokeOutcome::default();

        let balance = self.chain.balance(key.address).await?;
        if !balance.is_zero() {
            let fee = self.chain.fee_estimate().await?;
            let cost = fee.cost(TRANSFER_GAS);
            if balance > cost {
                let amount = balance - cost;
                let mut tx = TransactionRequest::default()
                    .to(owner)
                    .value(amount)
                    .gas_limit(TRANSFER_GAS);
                tx = match (fee.kind, fee.max_priority_fee_per_gas) {
                    (FeeKind::Eip1559, Some(priority)) => tx
                        .max_fee_per_gas(fee.max_fee_per_gas)
                        .max_priority_fee_per_gas(priority),
                    _ => tx.gas_price(fee.max_fee_per_gas),
                };

                let signer = key.signer()?;
                let tx_hash = self.chain.send_as(&signer, tx).await?;
                self.chain
                    .wait_for_receipt(tx_hash)
                    .await
                    .map_err(|source| Error::AfterBroadcast { tx_hash, source })?;

                tracing::info!(
                    owner = %owner,
                    session_key = %key.address,
                    amount = %amount,
                    tx_hash = %tx_hash,
                    "Swept session key balance to owner"
                );
                outcome.swept = amount;
                outcome.sweep_tx = Some(tx_hash);
            }
        }

        if self
            .chain
            .session_key_record(owner, key.address)
            .await?
            .is_some()
        {
            outcome.revoke_tx = Some(self.revoke_on_chain(key.address).await?);
        }

        self.store
            .delete(&keys::session_key(self.environment, &owner))?;
        tracing::info!(owner = %owner, session_key = %key.address, "Session key revoked");
        Ok(outcome)
    }

    /// Lifecycle state of the connected owner's key. Read-only.
    pub async fn state(&self) -> Result<SessionState> {
        let owner = self.wallet.owner().await?;
        let Some(key) = self.stored(owner)? else {
            return Ok(SessionState::Absent);
        };

        let now = self.chain.block_timestamp().await?;
        let record = self.chain.session_key_record(owner, key.address).await?;
        if record.is_some_and(|r| r.is_time_valid(now)) {
            return Ok(SessionState::Active);
        }

        if self.chain.balance(key.address).await?.is_zero() {
            Ok(SessionState::ExpiredEmpty)
        } else {
            Ok(SessionState::ExpiredWithBalance)
        }
    }

    /// The stored key of `owner`, if any. A record belonging to someone else
    /// is discarded.
    pub fn stored(&self, owner: Address) -> Result<Option<SessionKey>> {
        let store_key = keys::session_key(self.environment, &owner);
        let Some(key) = read_json::<SessionKey>(self.store.as_ref(), &store_key)? else {
            return Ok(None);
        };

        if key.owner != owner {
            tracing::warn!(
                owner = %owner,
                stored_owner = %key.owner,
                "Discarding session key of another owner"
            );
            self.store.delete(&store_key)?;
            return Ok(None);
        }
        Ok(Some(key))
    }

    fn persist(&self, key: &SessionKey) -> Result<()> {
        write_json(
            self.store.as_ref(),
            &keys::session_key(self.environment, &key.owner),
            key,
        )?;
        Ok(())
    }

    async fn register(&self, session_key: Address, valid_after: u64, valid_until: u64) -> Result<()> {
        let call = ISessionKeyManager::registerSessionKeyCall {
            sessionKey: session_key,
            validAfter: valid_after,
            validUntil: valid_until,
            allowedTarget: self.target,
            allowedSelectors: self.granted.clone(),
            spendingLimit: self.policy.spending_limit,
        };
        self.send_owner_call(call.abi_encode().into()).await?;
        Ok(())
    }

    async fn revoke_on_chain(&self, session_key: Address) -> Result<TxHash> {
        let call = ISessionKeyManager::revokeSessionKeyCall {
            sessionKey: session_key,
        };
        self.send_owner_call(call.abi_encode().into()).await
    }

    /// One owner prompt; waits for confirmation.
    async fn send_owner_call(&self, input: Bytes) -> Result<TxHash> {
        self.wallet.ensure_chain(self.chain.chain_id()).await?;
        let tx = TransactionRequest::default()
            .to(self.session_manager)
            .input(input.into());
        let tx_hash = self.wallet.send_transaction(tx).await?;
        self.chain
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|source| Error::AfterBroadcast { tx_hash, source })?;
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::DelegatedAction;
    use crate::testing::Harness;

    fn follow_selector() -> Selector {
        DelegatedAction::follow(Address::repeat_byte(0x77), true).selector()
    }

    #[tokio::test]
    async fn first_use_registers_and_funds_a_key() {
        let h = Harness::new();
        assert_eq!(h.manager.state().await.unwrap(), SessionState::Absent);

        let readiness = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap();
        let Readiness::Ready(session) = readiness else {
            panic!("expected a ready session");
        };

        assert_eq!(session.owner(), h.wallet.address());
        let record = h.chain.record(h.wallet.address(), session.address()).unwrap();
        assert_eq!(record.allowed_target, h.blog);
        assert!(record.allows_selector(follow_selector()));
        assert!(!h.chain.balance_of(session.address()).is_zero());

        // registration + funding transfer
        assert_eq!(h.wallet.transactions(), 2);
        assert_eq!(h.manager.state().await.unwrap(), SessionState::Active);
        assert!(h.manager.stored(h.wallet.address()).unwrap().is_some());
    }

    #[tokio::test]
    async fn valid_key_is_reused_without_prompts() {
        let h = Harness::new();
        let Readiness::Ready(first) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };
        let prompts = h.wallet.transactions();

        let Readiness::Ready(second) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };
        assert_eq!(first.address(), second.address());
        assert_eq!(h.wallet.transactions(), prompts);
    }

    #[tokio::test]
    async fn expired_key_with_balance_is_reauthorized_in_place() {
        let h = Harness::new();
        let Readiness::Ready(session) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };
        let balance = h.chain.balance_of(session.address());

        h.chain.advance(SessionPolicy::default().validity.as_secs() + 60);
        assert_eq!(
            h.manager.state().await.unwrap(),
            SessionState::ExpiredWithBalance
        );

        let prompts = h.wallet.transactions();
        let Readiness::Ready(renewed) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };

        assert_eq!(renewed.address(), session.address());
        // exactly one owner signature: the re-registration
        assert_eq!(h.wallet.transactions(), prompts + 1);
        assert_eq!(h.chain.balance_of(renewed.address()), balance);
        assert!(renewed.key.valid_until > session.key.valid_until);
    }

    #[tokio::test]
    async fn expired_empty_key_is_replaced() {
        let h = Harness::new();
        let Readiness::Ready(session) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };
        h.chain.set_balance(session.address(), U256::ZERO);
        h.chain.advance(SessionPolicy::default().validity.as_secs() + 60);
        assert_eq!(h.manager.state().await.unwrap(), SessionState::ExpiredEmpty);

        let Readiness::Ready(fresh) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };
        assert_ne!(fresh.address(), session.address());
        assert!(h.chain.record(h.wallet.address(), session.address()).is_none());
    }

    #[tokio::test]
    async fn empty_key_rejected_on_chain_is_revoked_before_replacement() {
        let h = Harness::new();
        let Readiness::Ready(session) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };
        // still inside its window, but no longer allowed to follow
        h.chain.mutate_record(h.wallet.address(), session.address(), |r| {
            r.allowed_selectors.retain(|s| *s != follow_selector());
        });
        h.chain.set_balance(session.address(), U256::ZERO);

        let Readiness::Ready(fresh) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };
        assert_ne!(fresh.address(), session.address());
        assert!(h.chain.record(h.wallet.address(), session.address()).is_none());
        assert!(h.chain.record(h.wallet.address(), fresh.address()).is_some());
    }

    #[tokio::test]
    async fn registration_refuses_a_wallet_on_another_chain() {
        let h = Harness::new();
        h.wallet.switch_chain(43114);

        let err = h
            .manager
            .ensure_ready(follow_selector(), U256::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Chain(crate::blockchain::ChainError::WrongChain { expected: 43113, actual: 43114 })
        ));
        assert!(!err.is_safe_fallback());
        assert_eq!(h.wallet.transactions(), 0);
        assert!(h.manager.stored(h.wallet.address()).unwrap().is_none());
    }

    #[tokio::test]
    async fn active_key_missing_selector_is_revoked_then_reregistered() {
        let h = Harness::new();
        let Readiness::Ready(session) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };
        h.chain.mutate_record(h.wallet.address(), session.address(), |r| {
            r.allowed_selectors.retain(|s| *s != follow_selector());
        });

        let prompts = h.wallet.transactions();
        let Readiness::Ready(renewed) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };

        assert_eq!(renewed.address(), session.address());
        assert!(renewed.record.allows_selector(follow_selector()));
        // revoke + register
        assert_eq!(h.wallet.transactions(), prompts + 2);
    }

    #[tokio::test]
    async fn ungranted_selector_is_unavailable_without_side_effects() {
        let h = Harness::new();
        let manager = h.manager_with_selectors(vec![ActionKind::Publish.selector()]);

        let readiness = manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap();
        assert!(matches!(
            readiness,
            Readiness::Unavailable(UnavailableReason::SelectorNotGranted(_))
        ));
        assert_eq!(h.wallet.transactions(), 0);
        assert_eq!(h.wallet.sign_prompts(), 0);
        assert!(h.chain.executed().is_empty());
    }

    #[tokio::test]
    async fn value_above_policy_limit_is_unavailable() {
        let h = Harness::new();
        let too_much = SessionPolicy::default().spending_limit + U256::from(1);

        let readiness = h
            .manager
            .ensure_ready(ActionKind::Collect.selector(), too_much)
            .await
            .unwrap();
        assert!(matches!(
            readiness,
            Readiness::Unavailable(UnavailableReason::ExceedsPolicyLimit { .. })
        ));
        assert_eq!(h.wallet.transactions(), 0);
    }

    #[tokio::test]
    async fn rejected_registration_stores_nothing() {
        let h = Harness::new();
        h.wallet.reject_prompts(true);

        let err = h
            .manager
            .ensure_ready(follow_selector(), U256::ZERO)
            .await
            .unwrap_err();
        assert!(err.is_safe_fallback());
        assert!(h.manager.stored(h.wallet.address()).unwrap().is_none());
    }

    #[tokio::test]
    async fn revoke_sweeps_balance_then_revokes() {
        let h = Harness::new();
        let Readiness::Ready(session) = h.manager.ensure_ready(follow_selector(), U256::ZERO).await.unwrap() else {
            panic!("expected a ready session");
        };
        let owner_before = h.chain.balance_of(h.wallet.address());
        let key_balance = h.chain.balance_of(session.address());

        let outcome = h.manager.revoke().await.unwrap();

        assert!(outcome.sweep_tx.is_some());
        assert!(outcome.revoke_tx.is_some());
        assert!(outcome.swept > U256::ZERO && outcome.swept <= key_balance);
        assert_eq!(
            h.chain.balance_of(h.wallet.address()),
            owner_before + outcome.swept
        );
        assert!(h.chain.record(h.wallet.address(), session.address()).is_none());
        assert_eq!(h.manager.state().await.unwrap(), SessionState::Absent);
    }

    #[tokio::test]
    async fn revoke_without_key_is_a_no_op() {
        let h = Harness::new();
        assert_eq!(h.manager.revoke().await.unwrap(), RevokeOutcome::default());
        assert_eq!(h.wallet.transactions(), 0);
    }
}
