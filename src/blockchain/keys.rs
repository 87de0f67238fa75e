// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 key material and Ethereum-style address derivation.
//!
//! Addresses are computed the Ethereum way:
//! 1. Take the uncompressed public key (65 bytes: `0x04 || x || y`)
//! 2. Hash the 64 coordinate bytes with keccak256
//! 3. Keep the last 20 bytes of the hash
//! 4. Encode as lowercase hex with a `0x` prefix (42 characters total)

use alloy::primitives::keccak256;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::rand_core::{OsRng, RngCore};

use crate::models::WalletAddress;

/// Length of a raw secp256k1 private key.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of an uncompressed SEC1 public key.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Errors raised by key handling, signing and recovery.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("entropy source failure: {0}")]
    Entropy(String),

    #[error("invalid private key")]
    InvalidKey,

    #[error("invalid public key length: expected {PUBLIC_KEY_LEN} bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("invalid signature")]
    InvalidSignature,
}

/// Generate a fresh private key from the OS entropy source.
///
/// Draws are repeated until they form a valid scalar (non-zero, below the
/// curve order), which in practice happens on the first attempt.
pub fn generate_private_key() -> Result<Vec<u8>, IdentityError> {
    loop {
        let mut bytes = [0u8; PRIVATE_KEY_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| IdentityError::Entropy(e.to_string()))?;

        if SigningKey::from_slice(&bytes).is_ok() {
            return Ok(bytes.to_vec());
        }
    }
}

/// Parse raw private key bytes into a signing key.
pub(crate) fn signing_key(private_key: &[u8]) -> Result<SigningKey, IdentityError> {
    // from_slice zero-pads short input; keys must be exactly 32 bytes
    if private_key.len() != PRIVATE_KEY_LEN {
        return Err(IdentityError::InvalidKey);
    }
    SigningKey::from_slice(private_key).map_err(|_| IdentityError::InvalidKey)
}

/// Derive the 65-byte uncompressed public key for a private key.
pub fn derive_public_key(private_key: &[u8]) -> Result<Vec<u8>, IdentityError> {
    let signing_key = signing_key(private_key)?;
    let encoded = signing_key.verifying_key().to_encoded_point(false);
    Ok(encoded.as_bytes().to_vec())
}

/// Derive the wallet address of an uncompressed public key.
pub fn derive_address(public_key: &[u8]) -> Result<WalletAddress, IdentityError> {
    if public_key.len() != PUBLIC_KEY_LEN {
        return Err(IdentityError::InvalidPublicKeyLength(public_key.len()));
    }

    let hash = keccak256(&public_key[1..]);
    Ok(WalletAddress(format!("0x{}", alloy::hex::encode(&hash[12..]))))
}

/// Wallet address controlled by a private key.
pub fn address_from_private_key(private_key: &[u8]) -> Result<WalletAddress, IdentityError> {
    derive_address(&derive_public_key(private_key)?)
}
