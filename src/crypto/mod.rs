// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Article encryption.
//!
//! The key for an article is derived from the owner's wallet signature over
//! a canonical message naming the article's permanent id. Nothing but the
//! raw signature is ever persisted; the AES key is re-derived on demand.
//!
//! **Ciphertext format**:
//! ```text
//! base64( nonce (12 bytes) | ciphertext+tag )
//! ```

pub mod cache;
pub mod cipher;
pub mod keys;

pub use cache::ArticleKeyCache;
pub use cipher::{decrypt_article, encrypt_article, is_encrypted, looks_encrypted};
pub use keys::{article_key_message, derive_article_key, ArticleKey};

/// Errors from key derivation and article encryption.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Tag mismatch: the key is wrong or the content was altered.
    #[error("authentication failed - wrong key or corrupted content")]
    Authentication,

    #[error("content is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("ciphertext too short: {0} bytes")]
    TooShort(usize),

    #[error("decrypted content is not UTF-8")]
    Utf8,

    #[error("key derivation failed")]
    KeyDerivation,

    #[error("wallet returned an empty signature")]
    EmptySignature,

    #[error("encryption failed")]
    Encryption,

    #[error("no key available for article {0}")]
    MissingKey(String),
}
