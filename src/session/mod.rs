// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Keys
//!
//! A session key is a device-local secp256k1 key registered on the session
//! key manager with a bounded grant (one target, a selector allow-list, a
//! spending limit and a validity window). Once registered, blog actions are
//! signed by it instead of prompting the owner's wallet.
//!
//! ## State Machine
//!
//! ```text
//!   Absent ──create──▶ Active ──time──▶ ExpiredWithBalance ──reauthorize──▶ Active
//!     ▲                  │
//!     │               revoke            ExpiredEmpty ──delete──▶ Absent
//!     └──────────────────┘
//! ```
//!
//! Validity is always re-read from chain before use; the local timestamp is
//! a hint only.

pub mod manager;
pub mod record;
pub mod signer;
pub mod submitter;

use alloy::primitives::U256;

pub use manager::{ActiveSession, Readiness, RevokeOutcome, SessionKeyManager};
pub use record::{Invalidity, SessionKey, SessionState};
pub use signer::{DelegatedAuthorization, DelegatedSigner};
pub use submitter::{ActionSubmitter, SubmitOutcome, SubmitPath};

use crate::blockchain::types::Selector;

/// Why no usable session key could be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnavailableReason {
    /// The action is outside what this client ever grants a session key.
    #[error("selector {0} is not delegated")]
    SelectorNotGranted(Selector),

    /// The value exceeds the limit any fresh registration would grant.
    #[error("value {requested} exceeds the session spending limit {limit}")]
    ExceedsPolicyLimit { requested: U256, limit: U256 },

    /// Registration went through but the record still rejects the call.
    #[error("record still invalid after registration: {0}")]
    StillInvalid(Invalidity),
}
