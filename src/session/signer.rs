// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed-data authorization of delegated calls by a session key.

use std::sync::Arc;
use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, U256},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol_types::Eip712Domain,
};

use super::manager::ActiveSession;
use super::record::Invalidity;
use super::UnavailableReason;
use crate::blockchain::actions::{DelegatedAction, DelegatedEnvelope};
use crate::blockchain::contract::DelegatedCall;
use crate::blockchain::error::{ChainError, Revert};
use crate::blockchain::signing::{delegation_domain, sign_hash, typed_data_hash};
use crate::blockchain::types::Selector;
use crate::blockchain::ChainClient;
use crate::error::{Error, Result};

/// A signed delegated call, ready to be wrapped into its
/// `...WithSessionKey` transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedAuthorization {
    pub owner: Address,
    pub session_key: Address,
    pub target: Address,
    pub selector: Selector,
    pub call_data: Bytes,
    pub value: U256,
    pub nonce: U256,
    pub deadline: U256,
    pub signature: Bytes,
}

impl DelegatedAuthorization {
    pub fn envelope(&self) -> DelegatedEnvelope {
        DelegatedEnvelope {
            owner: self.owner,
            session_key: self.session_key,
            deadline: self.deadline,
            signature: self.signature.clone(),
        }
    }

    /// Transaction the session key sends to the target.
    pub fn transaction(&self, action: &DelegatedAction) -> TransactionRequest {
        TransactionRequest::default()
            .to(self.target)
            .value(self.value)
            .gas_limit(action.gas_units())
            .input(action.delegated_call_data(&self.envelope()).into())
    }
}

pub struct DelegatedSigner {
    chain: Arc<dyn ChainClient>,
    domain: Eip712Domain,
    target: Address,
    deadline_horizon: Duration,
}

impl DelegatedSigner {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        session_manager: Address,
        target: Address,
        deadline_horizon: Duration,
    ) -> Self {
        let domain = delegation_domain(chain.chain_id(), session_manager);
        Self {
            chain,
            domain,
            target,
            deadline_horizon,
        }
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Sign `action` for `session` against the current on-chain nonce.
    ///
    /// The record is re-read here so a call that would revert on the
    /// allow-list or spending limit is refused before any broadcast.
    pub async fn authorize(
        &self,
        session: &ActiveSession,
        action: &DelegatedAction,
    ) -> Result<DelegatedAuthorization> {
        let owner = session.owner();
        let record = self
            .chain
            .session_key_record(owner, session.address())
            .await?
            .ok_or(Error::Chain(ChainError::Reverted(Revert::SessionKeyNotFound)))?;

        let now = self.chain.block_timestamp().await?;
        match record.check(self.target, action.selector(), now, action.value()) {
            Ok(()) => {}
            Err(Invalidity::SpendingLimit {
                requested,
                remaining,
            }) => {
                return Err(Error::SpendingLimitExceeded {
                    requested,
                    remaining,
                })
            }
            Err(invalidity) => {
                return Err(Error::SessionUnavailable(UnavailableReason::StillInvalid(
                    invalidity,
                )))
            }
        }

        let deadline = U256::from(now + self.deadline_horizon.as_secs());
        let authorization =
            self.sign_with_nonce(&session.signer, owner, action, record.nonce, deadline)?;

        tracing::debug!(
            owner = %owner,
            session_key = %session.address(),
            action = %action.kind(),
            nonce = %record.nonce,
            deadline = %deadline,
            "Signed delegated call"
        );
        Ok(authorization)
    }

    /// Sign without consulting the chain.
    pub fn sign_with_nonce(
        &self,
        signer: &PrivateKeySigner,
        owner: Address,
        action: &DelegatedAction,
        nonce: U256,
        deadline: U256,
    ) -> Result<DelegatedAuthorization> {
        let call = DelegatedCall {
            owner,
            sessionKey: signer.address(),
            target: self.target,
            selector: action.selector(),
            callData: action.call_data(),
            value: action.value(),
            nonce,
            deadline,
        };
        let hash = typed_data_hash(&self.domain, &call);
        let signature = sign_hash(signer, &hash)?;

        Ok(DelegatedAuthorization {
            owner,
            session_key: call.sessionKey,
            target: call.target,
            selector: call.selector,
            call_data: call.callData,
            value: call.value,
            nonce,
            deadline,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::signing::{generate_session_signer, recover_signer};
    use crate::blockchain::ActionKind;
    use crate::session::Readiness;
    use crate::testing::Harness;

    fn signer_for(h: &Harness) -> DelegatedSigner {
        DelegatedSigner::new(
            h.chain.clone(),
            h.session_manager,
            h.blog,
            Duration::from_secs(300),
        )
    }

    #[test]
    fn signature_recovers_to_session_key() {
        let h = Harness::new();
        let signer = signer_for(&h);
        let key = generate_session_signer();
        let action = DelegatedAction::follow(Address::repeat_byte(0x09), true);

        let auth = signer
            .sign_with_nonce(&key, h.wallet.address(), &action, U256::from(3), U256::from(99))
            .unwrap();

        let call = DelegatedCall {
            owner: auth.owner,
            sessionKey: auth.session_key,
            target: auth.target,
            selector: auth.selector,
            callData: auth.call_data.clone(),
            value: auth.value,
            nonce: auth.nonce,
            deadline: auth.deadline,
        };
        let hash = typed_data_hash(signer.domain(), &call);
        assert_eq!(recover_signer(&hash, &auth.signature).unwrap(), key.address());
        assert_eq!(auth.signature.len(), 65);
    }

    #[test]
    fn transaction_wraps_the_delegated_twin() {
        let h = Harness::new();
        let signer = signer_for(&h);
        let key = generate_session_signer();
        let tip = U256::from(1_000);
        let action = DelegatedAction::evaluate(U256::from(1), 5, "nice", Address::ZERO, U256::ZERO, tip);

        let auth = signer
            .sign_with_nonce(&key, h.wallet.address(), &action, U256::ZERO, U256::from(10))
            .unwrap();
        let tx = auth.transaction(&action);

        assert_eq!(tx.value, Some(tip));
        let input = tx.input.input().unwrap();
        let (envelope, decoded) = DelegatedAction::decode_delegated(input, tip).unwrap();
        assert_eq!(envelope, auth.envelope());
        assert_eq!(decoded, action);
    }

    #[tokio::test]
    async fn authorize_uses_the_on_chain_nonce_and_chain_deadline() {
        let h = Harness::new();
        let Readiness::Ready(session) = h
            .manager
            .ensure_ready(ActionKind::Follow.selector(), U256::ZERO)
            .await
            .unwrap()
        else {
            panic!("expected a ready session");
        };
        h.chain.mutate_record(h.wallet.address(), session.address(), |r| {
            r.nonce = U256::from(7);
        });

        let signer = signer_for(&h);
        let action = DelegatedAction::follow(Address::repeat_byte(0x09), true);
        let auth = signer.authorize(&session, &action).await.unwrap();

        assert_eq!(auth.nonce, U256::from(7));
        assert_eq!(auth.deadline, U256::from(h.chain.timestamp() + 300));
    }

    #[tokio::test]
    async fn over_limit_value_is_refused_before_signing() {
        let h = Harness::new();
        let Readiness::Ready(session) = h
            .manager
            .ensure_ready(ActionKind::Collect.selector(), U256::ZERO)
            .await
            .unwrap()
        else {
            panic!("expected a ready session");
        };
        let remaining = session.record.remaining_allowance();

        let action = DelegatedAction::collect(U256::from(1), Address::ZERO, remaining + U256::from(1));
        let err = signer_for(&h).authorize(&session, &action).await.unwrap_err();
        assert!(matches!(err, Error::SpendingLimitExceeded { .. }));
    }
}
