// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! chainpress - Delegated Session Keys & Encrypted Article Publishing
//!
//! Client-side protocol core of an on-chain blogging platform. Articles live
//! on a content-addressed storage network as path manifests; ownership and
//! social actions are recorded on an EVM chain, signed by a short-lived
//! session key instead of prompting the owner's wallet for every action.
//!
//! ## Modules
//!
//! - `session` - Session key lifecycle, delegated signing and submission
//! - `funding` - Lazy gas and storage-account top-ups
//! - `crypto` - Article key derivation and AES-GCM encryption
//! - `publish` - Manifests, two-phase encrypted publishing, read path
//! - `gateway` - Storage gateway reads with ordered fallback
//! - `blockchain` - Contract bindings, chain client, owner wallet
//! - `storage` - Device-local key-value store (redb)

pub mod blockchain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod funding;
pub mod gateway;
pub mod publish;
pub mod session;
pub mod storage;
pub mod uploader;

#[cfg(test)]
mod testing;

pub use error::{Error, ErrorCode, Result};
