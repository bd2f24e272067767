// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM article encryption.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{rngs::OsRng, RngCore};

use super::keys::ArticleKey;
use super::CryptoError;
use crate::blockchain::Visibility;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Smallest decoded payload that can be a ciphertext (nonce + tag).
pub const MIN_CIPHERTEXT_LEN: usize = NONCE_LEN + TAG_LEN;

/// Encrypt `plaintext` under a fresh random nonce.
pub fn encrypt_article(plaintext: &str, key: &ArticleKey) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::Encryption)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::Encryption)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Decrypt a base64 `nonce | ciphertext+tag` payload.
pub fn decrypt_article(encoded: &str, key: &ArticleKey) -> Result<String, CryptoError> {
    let raw = STANDARD.decode(encoded.trim())?;
    if raw.len() < MIN_CIPHERTEXT_LEN {
        return Err(CryptoError::TooShort(raw.len()));
    }

    let (nonce, body) = raw.split_at(NONCE_LEN);
    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::Authentication)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), body)
        .map_err(|_| CryptoError::Authentication)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Utf8)
}

/// Heuristic: valid base64 whose decoded length fits a nonce and a tag.
///
/// Long base64-looking plaintext is misclassified; prefer [`is_encrypted`]
/// with the on-chain visibility flag.
pub fn looks_encrypted(content: &str) -> bool {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return false;
    }
    match STANDARD.decode(trimmed) {
        Ok(raw) => raw.len() >= MIN_CIPHERTEXT_LEN,
        Err(_) => false,
    }
}

/// Whether `content` should be treated as ciphertext. The visibility flag is
/// authoritative when known.
pub fn is_encrypted(content: &str, visibility: Option<Visibility>) -> bool {
    match visibility {
        Some(Visibility::Encrypted) => true,
        Some(Visibility::Public) => false,
        None => looks_encrypted(content),
    }
}
