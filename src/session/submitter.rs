// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Delegated call submission with a direct owner-signed fallback.

use std::sync::Arc;

use alloy::{
    primitives::{Address, TxHash},
    rpc::types::TransactionRequest,
};
use tokio::sync::Mutex;

use super::manager::{Readiness, SessionKeyManager};
use super::signer::{DelegatedAuthorization, DelegatedSigner};
use crate::blockchain::actions::DelegatedAction;
use crate::blockchain::error::ChainError;
use crate::blockchain::types::TxReceipt;
use crate::blockchain::{ChainClient, OwnerWallet};
use crate::error::{Error, Result};

/// Which entry point carried the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPath {
    Delegated,
    Direct,
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub tx_hash: TxHash,
    pub path: SubmitPath,
    pub receipt: TxReceipt,
}

/// Runs blog actions, one at a time.
///
/// Delegated calls from one session key consume strictly sequential nonces,
/// so every submission holds the in-flight lock from nonce read to receipt.
pub struct ActionSubmitter {
    manager: Arc<SessionKeyManager>,
    signer: DelegatedSigner,
    chain: Arc<dyn ChainClient>,
    wallet: Arc<dyn OwnerWallet>,
    target: Address,
    in_flight: Mutex<()>,
}

impl ActionSubmitter {
    pub fn new(
        manager: Arc<SessionKeyManager>,
        signer: DelegatedSigner,
        chain: Arc<dyn ChainClient>,
        wallet: Arc<dyn OwnerWallet>,
    ) -> Self {
        let target = manager.target();
        Self {
            manager,
            signer,
            chain,
            wallet,
            target,
            in_flight: Mutex::new(()),
        }
    }

    pub fn manager(&self) -> &SessionKeyManager {
        &self.manager
    }

    /// Run `action` through its session key. No fallback.
    pub async fn execute_delegated(&self, action: &DelegatedAction) -> Result<SubmitOutcome> {
        let _guard = self.in_flight.lock().await;
        self.run_delegated(action).await
    }

    /// Run `action` delegated when possible, otherwise as a direct
    /// owner-signed call.
    ///
    /// The direct path is taken only when no session key could be made
    /// ready, or when the delegated attempt failed before anything was sent
    /// (prompt dismissed, reads failing in transport). Reverts, failed sends
    /// and failures after broadcast are returned as-is.
    pub async fn submit(&self, action: &DelegatedAction) -> Result<SubmitOutcome> {
        let _guard = self.in_flight.lock().await;

        match self.run_delegated(action).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if matches!(err, Error::SessionUnavailable(_)) || err.is_safe_fallback() => {
                tracing::info!(
                    action = %action.kind(),
                    reason = %err,
                    "Falling back to direct owner call"
                );
                self.run_direct(action).await
            }
            Err(err) => Err(err),
        }
    }

    async fn run_delegated(&self, action: &DelegatedAction) -> Result<SubmitOutcome> {
        let session = match self
            .manager
            .ensure_ready(action.selector(), action.value())
            .await?
        {
            Readiness::Ready(session) => session,
            Readiness::Unavailable(reason) => return Err(Error::SessionUnavailable(reason)),
        };

        let authorization = self.signer.authorize(&session, action).await?;
        let tx_hash = match self
            .chain
            .send_as(&session.signer, authorization.transaction(action))
            .await
        {
            Ok(hash) => hash,
            // Rejected at estimation: nothing was broadcast. Refetch the
            // nonce and sign once more.
            Err(ChainError::Reverted(revert)) if revert.is_signature() => {
                tracing::warn!(
                    session_key = %session.address(),
                    reason = %revert,
                    "Delegated signature rejected, re-signing"
                );
                let authorization = self.signer.authorize(&session, action).await?;
                self.chain
                    .send_as(&session.signer, authorization.transaction(action))
                    .await
                    .map_err(|e| send_error(&authorization, e))?
            }
            Err(e) => return Err(send_error(&authorization, e)),
        };

        let receipt = self
            .chain
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|source| Error::AfterBroadcast { tx_hash, source })?;

        tracing::info!(
            owner = %session.owner(),
            session_key = %session.address(),
            action = %action.kind(),
            tx_hash = %tx_hash,
            "Delegated call confirmed"
        );
        Ok(SubmitOutcome {
            tx_hash,
            path: SubmitPath::Delegated,
            receipt,
        })
    }

    async fn run_direct(&self, action: &DelegatedAction) -> Result<SubmitOutcome> {
        self.wallet.ensure_chain(self.chain.chain_id()).await?;
        let tx = TransactionRequest::default()
            .to(self.target)
            .value(action.value())
            .input(action.call_data().into());
        let tx_hash = self.wallet.send_transaction(tx).await?;
        let receipt = self
            .chain
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|source| Error::AfterBroadcast { tx_hash, source })?;

        tracing::info!(action = %action.kind(), tx_hash = %tx_hash, "Direct call confirmed");
        Ok(SubmitOutcome {
            tx_hash,
            path: SubmitPath::Direct,
            receipt,
        })
    }
}

/// A transport failure of the send itself is ambiguous: the node may have
/// taken the transaction before the connection dropped.
fn send_error(authorization: &DelegatedAuthorization, err: ChainError) -> Error {
    match err {
        ChainError::Transport(_) => {
            tracing::warn!(
                session_key = %authorization.session_key,
                nonce = %authorization.nonce,
                error = %err,
                "Delegated send failed in transport"
            );
            Error::BroadcastUncertain {
                session_key: authorization.session_key,
                nonce: authorization.nonce,
                source: err,
            }
        }
        other => other.into(),
    }
}
