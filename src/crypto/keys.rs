// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature-based article key derivation (HKDF-SHA256).

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;

use super::CryptoError;

/// Prefix of the message the owner signs to unlock an article.
pub const KEY_MESSAGE_PREFIX: &str = "chainpress article key v1:\n";

/// Fixed HKDF salt.
const HKDF_SALT: &[u8] = b"chainpress-article-salt-v1";

/// Fixed HKDF info string.
const HKDF_INFO: &[u8] = b"chainpress-article-aes-256-gcm";

/// 256-bit AES key for one article. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct ArticleKey([u8; 32]);

impl ArticleKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ArticleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArticleKey([REDACTED])")
    }
}

/// Canonical message the owner signs for `article_id` (the permanent
/// manifest id).
pub fn article_key_message(article_id: &str) -> String {
    format!("{KEY_MESSAGE_PREFIX}{article_id}")
}

/// Derive the article key from the owner's signature bytes.
pub fn derive_article_key(signature: &[u8]) -> Result<ArticleKey, CryptoError> {
    if signature.is_empty() {
        return Err(CryptoError::EmptySignature);
    }

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), signature);
    let mut okm = [0u8; 32];
    hk.expand(HKDF_INFO, &mut okm)
        .map_err(|_| CryptoError::KeyDerivation)?;
    Ok(ArticleKey(okm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let sig = [0x5au8; 65];
        assert_eq!(derive_article_key(&sig).unwrap(), derive_article_key(&sig).unwrap());
    }

    #[test]
    fn different_signatures_give_different_keys() {
        let a = derive_article_key(&[1u8; 65]).unwrap();
        let b = derive_article_key(&[2u8; 65]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_signature_is_rejected() {
        assert!(matches!(derive_article_key(&[]), Err(CryptoError::EmptySignature)));
    }

    #[test]
    fn message_names_the_article() {
        let msg = article_key_message("abc123");
        assert!(msg.starts_with(KEY_MESSAGE_PREFIX));
        assert!(msg.ends_with("abc123"));
    }

    #[test]
    fn debug_redacts_key() {
        let key = derive_article_key(&[9u8; 65]).unwrap();
        assert_eq!(format!("{key:?}"), "ArticleKey([REDACTED])");
    }
}
