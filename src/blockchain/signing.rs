// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session key material and EIP-712 signing of delegated calls.
//!
//! The typed-data domain is fixed per deployment: protocol name and version,
//! the chain id, and the session key manager as verifying contract. The
//! contract recomputes the same digest and recovers the session key from the
//! 65-byte `r ∥ s ∥ v` signature.

use std::borrow::Cow;

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    signers::{local::PrivateKeySigner, SignerSync},
    sol_types::{Eip712Domain, SolStruct},
};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use super::contract::DelegatedCall;
use super::error::ChainError;

/// EIP-712 domain name of the session key manager.
pub const DOMAIN_NAME: &str = "ChainpressSessionKeys";

/// EIP-712 domain version.
pub const DOMAIN_VERSION: &str = "1";

/// Typed-data domain binding signatures to one chain and one manager.
pub fn delegation_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(DOMAIN_NAME)),
        Some(Cow::Borrowed(DOMAIN_VERSION)),
        Some(U256::from(chain_id)),
        Some(verifying_contract),
        None,
    )
}

/// Digest the contract recovers the session key from.
pub fn typed_data_hash(domain: &Eip712Domain, call: &DelegatedCall) -> B256 {
    call.eip712_signing_hash(domain)
}

/// Sign a prehashed digest, returning the 65-byte `r ∥ s ∥ v` encoding.
pub fn sign_hash(signer: &PrivateKeySigner, hash: &B256) -> Result<Bytes, ChainError> {
    let signature = signer
        .sign_hash_sync(hash)
        .map_err(|e| ChainError::InvalidSignature(e.to_string()))?;
    Ok(Bytes::copy_from_slice(&signature.as_bytes()))
}

/// Recover the signer address of a 65-byte signature over `hash`.
pub fn recover_signer(hash: &B256, signature: &[u8]) -> Result<Address, ChainError> {
    let signature = alloy::primitives::Signature::from_raw(signature)
        .map_err(|e| ChainError::InvalidSignature(e.to_string()))?;
    signature
        .recover_address_from_prehash(hash)
        .map_err(|e| ChainError::InvalidSignature(e.to_string()))
}

/// Generate a fresh secp256k1 session key.
pub fn generate_session_signer() -> PrivateKeySigner {
    PrivateKeySigner::from_signing_key(SigningKey::random(&mut OsRng))
}

/// Create a signer from a hex private key (with or without 0x prefix).
pub fn signer_from_hex(private_key_hex: &str) -> Result<PrivateKeySigner, ChainError> {
    let key_bytes = alloy::hex::decode(private_key_hex.trim())
        .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))
}

/// Hex-encode a signer's private key (64 characters, no 0x prefix).
pub fn signer_to_hex(signer: &PrivateKeySigner) -> String {
    alloy::hex::encode(signer.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_call(owner: Address, session_key: Address) -> DelegatedCall {
        DelegatedCall {
            owner,
            sessionKey: session_key,
            target: Address::repeat_byte(0x42),
            selector: [0xaa, 0xbb, 0xcc, 0xdd].into(),
            callData: Bytes::from_static(&[1, 2, 3]),
            value: U256::from(10),
            nonce: U256::from(3),
            deadline: U256::from(1_700_000_300u64),
        }
    }

    #[test]
    fn signature_recovers_session_key() {
        let signer = generate_session_signer();
        let domain = delegation_domain(43113, Address::repeat_byte(0x01));
        let hash = typed_data_hash(&domain, &sample_call(Address::repeat_byte(0x09), signer.address()));

        let signature = sign_hash(&signer, &hash).unwrap();
        assert_eq!(signature.len(), 65);
        assert_eq!(recover_signer(&hash, &signature).unwrap(), signer.address());
    }

    #[test]
    fn digest_depends_on_nonce_and_chain() {
        let signer = generate_session_signer();
        let call = sample_call(Address::repeat_byte(0x09), signer.address());
        let domain = delegation_domain(43113, Address::repeat_byte(0x01));

        let base = typed_data_hash(&domain, &call);
        let bumped = typed_data_hash(
            &domain,
            &DelegatedCall {
                nonce: call.nonce + U256::from(1),
                ..call.clone()
            },
        );
        let other_chain = typed_data_hash(&delegation_domain(43114, Address::repeat_byte(0x01)), &call);

        assert_ne!(base, bumped);
        assert_ne!(base, other_chain);
    }

    #[test]
    fn hex_key_round_trips() {
        let signer = generate_session_signer();
        let hex = signer_to_hex(&signer);
        assert_eq!(hex.len(), 64);

        let restored = signer_from_hex(&format!("0x{hex}")).unwrap();
        assert_eq!(restored.address(), signer.address());
        assert!(signer_from_hex("not-hex").is_err());
    }
}
