// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain error taxonomy and the single place raw provider errors are
//! classified.

use std::fmt;

use alloy::primitives::{Address, TxHash, U256};
use alloy::sol_types::SolInterface;
use alloy::transports::{RpcError, TransportError};

use super::contract::ISessionKeyManager::ISessionKeyManagerErrors;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// Decoded reason of a contract revert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revert {
    SessionKeyNotFound,
    SessionKeyExpired,
    SessionKeyStillActive,
    SelectorNotAllowed([u8; 4]),
    TargetNotAllowed(Address),
    SpendingLimitExceeded { requested: U256, remaining: U256 },
    InvalidSignature,
    SignatureExpired { deadline: U256 },
    InvalidNonce { expected: U256 },
    Other(String),
}

impl Revert {
    /// Decode revert data returned by the node.
    pub fn from_revert_data(data: &[u8]) -> Self {
        match ISessionKeyManagerErrors::abi_decode(data) {
            Ok(decoded) => decoded.into(),
            Err(_) => Revert::Other(format!("0x{}", alloy::hex::encode(data))),
        }
    }

    /// The session key record no longer authorizes the call.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Revert::SessionKeyNotFound
                | Revert::SessionKeyExpired
                | Revert::SessionKeyStillActive
                | Revert::SelectorNotAllowed(_)
                | Revert::TargetNotAllowed(_)
        )
    }

    /// The signature itself was rejected; the caller must refetch the nonce
    /// and re-sign.
    pub fn is_signature(&self) -> bool {
        matches!(
            self,
            Revert::InvalidSignature | Revert::SignatureExpired { .. } | Revert::InvalidNonce { .. }
        )
    }
}

impl From<ISessionKeyManagerErrors> for Revert {
    fn from(err: ISessionKeyManagerErrors) -> Self {
        use ISessionKeyManagerErrors as E;
        match err {
            E::SessionKeyNotFound(_) => Revert::SessionKeyNotFound,
            E::SessionKeyExpired(_) => Revert::SessionKeyExpired,
            E::SessionKeyStillActive(_) => Revert::SessionKeyStillActive,
            E::SelectorNotAllowed(e) => Revert::SelectorNotAllowed(e.selector.0),
            E::TargetNotAllowed(e) => Revert::TargetNotAllowed(e.target),
            E::SpendingLimitExceeded(e) => Revert::SpendingLimitExceeded {
                requested: e.requested,
                remaining: e.remaining,
            },
            E::InvalidSignature(_) => Revert::InvalidSignature,
            E::SignatureExpired(e) => Revert::SignatureExpired {
                deadline: e.deadline,
            },
            E::InvalidNonce(e) => Revert::InvalidNonce {
                expected: e.expected,
            },
        }
    }
}

impl fmt::Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revert::SessionKeyNotFound => write!(f, "session key not registered"),
            Revert::SessionKeyExpired => write!(f, "session key expired"),
            Revert::SessionKeyStillActive => write!(f, "session key still active"),
            Revert::SelectorNotAllowed(sel) => {
                write!(f, "selector 0x{} not allowed", alloy::hex::encode(sel))
            }
            Revert::TargetNotAllowed(target) => write!(f, "target {target} not allowed"),
            Revert::SpendingLimitExceeded {
                requested,
                remaining,
            } => write!(
                f,
                "spending limit exceeded (requested {requested}, remaining {remaining})"
            ),
            Revert::InvalidSignature => write!(f, "invalid signature"),
            Revert::SignatureExpired { deadline } => {
                write!(f, "signature expired at {deadline}")
            }
            Revert::InvalidNonce { expected } => write!(f, "invalid nonce, expected {expected}"),
            Revert::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Request rejected by user")]
    UserRejected,

    #[error("Execution reverted: {0}")]
    Reverted(Revert),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Transaction {0} failed on-chain")]
    TransactionFailed(TxHash),

    #[error("Transaction {0} not confirmed")]
    ReceiptTimeout(TxHash),

    #[error("Wallet exposes no account")]
    NoAccount,

    #[error("Wallet is on chain {actual}, expected {expected}")]
    WrongChain { expected: u64, actual: u64 },
}

/// Classify a raw transport error into a [`ChainError`].
///
/// This is the only place provider error text is inspected; everything
/// downstream switches on the variant.
pub fn classify(err: TransportError) -> ChainError {
    match &err {
        RpcError::ErrorResp(payload) => {
            if payload.code == USER_REJECTED_CODE {
                return ChainError::UserRejected;
            }
            if let Some(data) = payload.as_revert_data() {
                return ChainError::Reverted(Revert::from_revert_data(&data));
            }
            let message = payload.message.to_lowercase();
            if message.contains("user rejected") || message.contains("user denied") {
                ChainError::UserRejected
            } else if message.contains("insufficient funds") {
                ChainError::InsufficientFunds(payload.message.to_string())
            } else if message.contains("execution reverted") {
                ChainError::Reverted(Revert::Other(payload.message.to_string()))
            } else {
                ChainError::Rpc(payload.message.to_string())
            }
        }
        RpcError::Transport(kind) => ChainError::Transport(kind.to_string()),
        _ => ChainError::Rpc(err.to_string()),
    }
}

/// Classify an error returned by a `sol!` contract call.
pub fn classify_contract(err: alloy::contract::Error) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(e) => classify(e),
        other => ChainError::Abi(other.to_string()),
    }
}
