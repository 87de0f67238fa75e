// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Recoverable message signatures.
//!
//! Messages are hashed with keccak256 and signed as a prehash. Signatures
//! are 65 bytes `r || s || v` where `v` is the recovery id (0 or 1). The
//! Ethereum-style offset form (27 or 28) is accepted on recovery.

use alloy::primitives::keccak256;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use super::keys::{derive_address, signing_key, IdentityError};
use crate::models::WalletAddress;

/// Length of a recoverable signature.
pub const SIGNATURE_LEN: usize = 65;

/// Sign `message` with a raw private key.
pub fn sign(message: &[u8], private_key: &[u8]) -> Result<Vec<u8>, IdentityError> {
    let key = signing_key(private_key)?;
    let digest = keccak256(message);

    let (signature, recovery_id) = key
        .sign_prehash_recoverable(digest.as_slice())
        .map_err(|_| IdentityError::InvalidKey)?;

    let mut out = Vec::with_capacity(SIGNATURE_LEN);
    out.extend_from_slice(&signature.to_bytes());
    out.push(recovery_id.to_byte());
    Ok(out)
}

/// Recover the address that produced `signature` over `message`.
///
/// Any malformed input (wrong length, out-of-range scalars, bad recovery
/// id, point not on the curve) yields [`IdentityError::InvalidSignature`].
pub fn recover_address(message: &[u8], signature: &[u8]) -> Result<WalletAddress, IdentityError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(IdentityError::InvalidSignature);
    }

    let recovery_id = parse_recovery_id(signature[64])?;
    let sig = Signature::from_slice(&signature[..64]).map_err(|_| IdentityError::InvalidSignature)?;
    let digest = keccak256(message);

    let verifying_key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
        .map_err(|_| IdentityError::InvalidSignature)?;

    derive_address(verifying_key.to_encoded_point(false).as_bytes())
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, IdentityError> {
    let id = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return Err(IdentityError::InvalidSignature),
    };
    RecoveryId::try_from(id).map_err(|_| IdentityError::InvalidSignature)
}
