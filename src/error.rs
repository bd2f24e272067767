// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crate-level error and its normalized codes.
//!
//! Every public operation fails with an [`Error`], and every [`Error`] maps to
//! exactly one [`ErrorCode`] that presentation layers switch on.

use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;

use crate::blockchain::{ChainError, Revert};
use crate::crypto::CryptoError;
use crate::gateway::GatewayError;
use crate::publish::ManifestError;
use crate::session::UnavailableReason;
use crate::storage::StoreError;
use crate::uploader::StorageNetworkError;

pub type Result<T> = std::result::Result<T, Error>;

/// Fixed set of failure codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UserRejected,
    Unauthorized,
    SpendingLimitExceeded,
    InsufficientFunds,
    Network,
    SignatureInvalid,
    DecryptionFailed,
    EncryptionFailed,
    ContractReverted,
    InvalidInput,
    Storage,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UserRejected => "user_rejected",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::SpendingLimitExceeded => "spending_limit_exceeded",
            ErrorCode::InsufficientFunds => "insufficient_funds",
            ErrorCode::Network => "network",
            ErrorCode::SignatureInvalid => "signature_invalid",
            ErrorCode::DecryptionFailed => "decryption_failed",
            ErrorCode::EncryptionFailed => "encryption_failed",
            ErrorCode::ContractReverted => "contract_reverted",
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::Storage => "storage",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("session key unavailable: {0}")]
    SessionUnavailable(UnavailableReason),

    #[error("spending limit exceeded (requested {requested}, remaining {remaining})")]
    SpendingLimitExceeded { requested: U256, remaining: U256 },

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    StorageNetwork(#[from] StorageNetworkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Failure after a transaction reached the network. Never retried
    /// through another path.
    #[error("transaction {tx_hash} failed after broadcast: {source}")]
    AfterBroadcast {
        tx_hash: TxHash,
        #[source]
        source: ChainError,
    },

    /// A send failed in transport, so the node may still have accepted the
    /// transaction. Never retried through another path.
    #[error("call from {session_key} with nonce {nonce} may have been broadcast: {source}")]
    BroadcastUncertain {
        session_key: Address,
        nonce: U256,
        #[source]
        source: ChainError,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Chain(e)
            | Error::AfterBroadcast { source: e, .. }
            | Error::BroadcastUncertain { source: e, .. } => chain_code(e),
            Error::SessionUnavailable(_) => ErrorCode::Unauthorized,
            Error::SpendingLimitExceeded { .. } => ErrorCode::SpendingLimitExceeded,
            Error::InsufficientFunds(_) => ErrorCode::InsufficientFunds,
            Error::Crypto(e) => match e {
                CryptoError::Encryption | CryptoError::KeyDerivation | CryptoError::EmptySignature => {
                    ErrorCode::EncryptionFailed
                }
                CryptoError::Authentication
                | CryptoError::Encoding(_)
                | CryptoError::TooShort(_)
                | CryptoError::Utf8
                | CryptoError::MissingKey(_) => ErrorCode::DecryptionFailed,
            },
            Error::Gateway(_) => ErrorCode::Network,
            Error::StorageNetwork(e) => match e {
                StorageNetworkError::Transport(_) => ErrorCode::Network,
                StorageNetworkError::UserRejected => ErrorCode::UserRejected,
                StorageNetworkError::Rejected(_) | StorageNetworkError::Io(_) => ErrorCode::Storage,
            },
            Error::Store(_) | Error::Manifest(_) => ErrorCode::Storage,
            Error::InvalidInput(_) => ErrorCode::InvalidInput,
        }
    }

    /// Only a dismissed prompt or a transport failure before anything was
    /// sent may be retried through the direct owner-signed path. Transport
    /// failures of the send itself surface as
    /// [`Error::BroadcastUncertain`] instead.
    pub fn is_safe_fallback(&self) -> bool {
        matches!(
            self,
            Error::Chain(ChainError::UserRejected) | Error::Chain(ChainError::Transport(_))
        )
    }

    /// Serializable `{code, message}` body for presentation layers.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

fn chain_code(err: &ChainError) -> ErrorCode {
    match err {
        ChainError::UserRejected => ErrorCode::UserRejected,
        ChainError::Reverted(Revert::SpendingLimitExceeded { .. }) => {
            ErrorCode::SpendingLimitExceeded
        }
        ChainError::Reverted(r) if r.is_authorization() => ErrorCode::Unauthorized,
        ChainError::Reverted(r) if r.is_signature() => ErrorCode::SignatureInvalid,
        ChainError::Reverted(_) | ChainError::TransactionFailed(_) => ErrorCode::ContractReverted,
        ChainError::InsufficientFunds(_) => ErrorCode::InsufficientFunds,
        ChainError::Transport(_) | ChainError::Rpc(_) | ChainError::ReceiptTimeout(_) => {
            ErrorCode::Network
        }
        ChainError::InvalidSignature(_) => ErrorCode::SignatureInvalid,
        ChainError::NoAccount => ErrorCode::Unauthorized,
        ChainError::WrongChain { .. } => ErrorCode::InvalidInput,
        ChainError::InvalidRpcUrl(_)
        | ChainError::InvalidPrivateKey(_)
        | ChainError::InvalidAmount(_)
        | ChainError::Abi(_) => ErrorCode::InvalidInput,
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}
