// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM chain integration.
//!
//! - [`contract`]: `sol!` interfaces of the session key manager and the blog
//! - [`actions`]: typed delegatable actions
//! - [`signing`]: EIP-712 digest and session key material
//! - [`client`]: chain reads and session-key broadcasts
//! - [`wallet`]: owner wallet capability
//! - [`error`]: error classification at the RPC boundary

pub mod actions;
pub mod client;
pub mod contract;
pub mod error;
pub mod signing;
pub mod types;
pub mod wallet;

pub use actions::{ActionKind, DelegatedAction, DelegatedEnvelope, Visibility};
pub use client::{AlloyChainClient, ChainClient};
pub use error::{ChainError, Revert};
pub use types::{FeeEstimate, NetworkConfig, SessionKeyRecord, TxReceipt, AVAX_FUJI, AVAX_MAINNET};
pub use wallet::{OwnerWallet, RpcOwnerWallet};
