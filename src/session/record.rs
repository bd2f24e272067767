// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local session key record and on-chain validity checks.

use std::fmt;

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blockchain::error::ChainError;
use crate::blockchain::signing::signer_from_hex;
use crate::blockchain::types::{Selector, SessionKeyRecord};

/// Session key as persisted on the device, keyed by `(environment, owner)`.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionKey {
    pub address: Address,
    /// Hex private key (no 0x prefix).
    pub private_key: String,
    pub owner: Address,
    /// Unix seconds, chain time.
    pub valid_until: u64,
    pub created_at: DateTime<Utc>,
}

impl SessionKey {
    pub fn signer(&self) -> Result<PrivateKeySigner, ChainError> {
        let signer = signer_from_hex(&self.private_key)?;
        if signer.address() != self.address {
            return Err(ChainError::InvalidPrivateKey(
                "stored key does not match its address".to_string(),
            ));
        }
        Ok(signer)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("address", &self.address)
            .field("private_key", &"[REDACTED]")
            .field("owner", &self.owner)
            .field("valid_until", &self.valid_until)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Why an on-chain record does not authorize a pending call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Invalidity {
    #[error("not registered on-chain")]
    NotRegistered,

    #[error("registered for target {actual}, expected {expected}")]
    TargetMismatch { expected: Address, actual: Address },

    #[error("selector {0} not in the allow-list")]
    SelectorMissing(Selector),

    #[error("not valid before {valid_after} (chain time {now})")]
    NotYetValid { valid_after: u64, now: u64 },

    #[error("expired at {valid_until} (chain time {now})")]
    Expired { valid_until: u64, now: u64 },

    #[error("spending limit: requested {requested}, remaining {remaining}")]
    SpendingLimit { requested: U256, remaining: U256 },
}

impl SessionKeyRecord {
    /// Check that this record authorizes calling `selector` on `target` at
    /// chain time `now` while forwarding `pending_value`.
    pub fn check(
        &self,
        target: Address,
        selector: Selector,
        now: u64,
        pending_value: U256,
    ) -> Result<(), Invalidity> {
        if !self.is_registered() {
            return Err(Invalidity::NotRegistered);
        }
        if self.allowed_target != target {
            return Err(Invalidity::TargetMismatch {
                expected: target,
                actual: self.allowed_target,
            });
        }
        if !self.allows_selector(selector) {
            return Err(Invalidity::SelectorMissing(selector));
        }
        if now < self.valid_after {
            return Err(Invalidity::NotYetValid {
                valid_after: self.valid_after,
                now,
            });
        }
        if now > self.valid_until {
            return Err(Invalidity::Expired {
                valid_until: self.valid_until,
                now,
            });
        }

        let remaining = self.remaining_allowance();
        if pending_value > remaining {
            return Err(Invalidity::SpendingLimit {
                requested: pending_value,
                remaining,
            });
        }
        Ok(())
    }
}

/// Lifecycle state of an owner's session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Active,
    ExpiredWithBalance,
    ExpiredEmpty,
}
