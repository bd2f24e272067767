// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Persisted State
//!
//! Two kinds of records live on the device and nowhere else:
//!
//! - the session key of an owner, keyed by `(environment, owner)`
//! - the wallet signature an article key is derived from, keyed by article id
//!
//! plus the address of the reusable placeholder upload per environment.
//!
//! Every record is an opaque JSON blob behind the [`KeyValueStore`] trait.
//! Absence is always a valid answer and simply triggers recreation upstream.
//!
//! ## Key Layout
//!
//! ```text
//! session-key/{environment}/{owner}     # SessionKey
//! article-signature/{article_id}        # hex wallet signature
//! placeholder/{environment}             # placeholder upload id
//! ```

pub mod keys;
pub mod kv;
pub mod redb_store;

pub use kv::{read_json, write_json, KeyValueStore, MemoryStore, StoreError, StoreResult};
pub use redb_store::RedbStore;
