// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet-signature authentication.
//!
//! ## Signed Payload
//!
//! ```text
//! <request path>&<nonce exactly as sent>&<raw body bytes>
//! ```
//!
//! The client signs the payload with its wallet key (keccak256 prehash,
//! 65-byte recoverable signature) and sends three headers:
//!
//! | Header | Content |
//! |--------|---------|
//! | `X-Wallet-Address` | claimed wallet address |
//! | `X-Wallet-Nonce` | decimal `u64`, strictly greater than the last accepted nonce |
//! | `X-Wallet-Signature` | hex signature, optional `0x` prefix |
//!
//! The nonce check and the nonce advance run in one storage transaction, so
//! two requests presenting the same nonce cannot both pass.

use std::sync::Arc;

use axum::http::HeaderMap;

use super::AuthError;
use crate::blockchain::recover_address;
use crate::models::WalletAddress;
use crate::storage::{Storage, StorageError};

// Lowercase so they can be used with `HeaderName::from_static`.
pub const ADDRESS_HEADER: &str = "x-wallet-address";
pub const NONCE_HEADER: &str = "x-wallet-nonce";
pub const SIGNATURE_HEADER: &str = "x-wallet-signature";

/// Raw credential headers of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub address: Option<String>,
    pub nonce: Option<String>,
    pub signature: Option<String>,
}

impl Credentials {
    /// Read the credential headers.
    ///
    /// All three must be present before any of them is parsed, so a request
    /// without credentials always reports the first missing header.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        for name in [ADDRESS_HEADER, NONCE_HEADER, SIGNATURE_HEADER] {
            if !headers.contains_key(name) {
                return Err(AuthError::MissingCredential(name));
            }
        }

        let read = |name: &'static str| -> Result<Option<String>, AuthError> {
            headers
                .get(name)
                .map(|value| {
                    value.to_str().map(|s| s.trim().to_string()).map_err(|_| {
                        AuthError::MalformedCredential(format!("{name} is not valid text"))
                    })
                })
                .transpose()
        };

        Ok(Self {
            address: read(ADDRESS_HEADER)?,
            nonce: read(NONCE_HEADER)?,
            signature: read(SIGNATURE_HEADER)?,
        })
    }
}

/// Identity proven by a request, attached to it as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCaller {
    pub address: WalletAddress,
    pub nonce: u64,
}

/// Build the byte string a client signs.
pub fn signed_payload(path: &str, nonce: &str, body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(path.len() + nonce.len() + body.len() + 2);
    payload.extend_from_slice(path.as_bytes());
    payload.push(b'&');
    payload.extend_from_slice(nonce.as_bytes());
    payload.push(b'&');
    payload.extend_from_slice(body);
    payload
}

pub struct Authenticator {
    storage: Arc<dyn Storage>,
}

impl Authenticator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Check that the request was signed by the claimed address.
    ///
    /// Does not consult stored nonces; used for registration, where no
    /// user exists yet.
    pub fn verify_signature(
        &self,
        credentials: &Credentials,
        path: &str,
        body: &[u8],
    ) -> Result<VerifiedCaller, AuthError> {
        let address = credentials
            .address
            .as_deref()
            .ok_or(AuthError::MissingCredential(ADDRESS_HEADER))?;
        let nonce_text = credentials
            .nonce
            .as_deref()
            .ok_or(AuthError::MissingCredential(NONCE_HEADER))?;
        let signature_text = credentials
            .signature
            .as_deref()
            .ok_or(AuthError::MissingCredential(SIGNATURE_HEADER))?;

        let nonce: u64 = nonce_text
            .parse()
            .map_err(|_| AuthError::MalformedCredential(format!("{NONCE_HEADER} is not a u64")))?;
        let signature_hex = signature_text.strip_prefix("0x").unwrap_or(signature_text);
        let signature = alloy::hex::decode(signature_hex)
            .map_err(|_| AuthError::MalformedCredential(format!("{SIGNATURE_HEADER} is not hex")))?;

        let payload = signed_payload(path, nonce_text, body);
        let recovered = recover_address(&payload, &signature).map_err(|e| {
            tracing::debug!(error = %e, claimed = address, "Signature recovery failed");
            AuthError::InvalidSignature
        })?;

        if !recovered.as_str().eq_ignore_ascii_case(address) {
            tracing::debug!(
                claimed = address,
                recovered = %recovered,
                "Signature from another address"
            );
            return Err(AuthError::InvalidSignature);
        }

        Ok(VerifiedCaller {
            address: recovered,
            nonce,
        })
    }

    /// Full authentication: signature, registered identity and fresh nonce.
    ///
    /// The advanced nonce is persisted on a best-effort basis: if writing it
    /// fails the failure is logged and the request is still accepted.
    pub fn authenticate(
        &self,
        credentials: &Credentials,
        path: &str,
        body: &[u8],
    ) -> Result<VerifiedCaller, AuthError> {
        let caller = self.verify_signature(credentials, path, body)?;

        let mut tx = self
            .storage
            .begin_tx()
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let mut user = match tx.get_user(&caller.address) {
            Ok(user) => user,
            Err(StorageError::NotFound { .. }) => {
                return Err(AuthError::UnknownIdentity(caller.address));
            }
            Err(e) => return Err(AuthError::Storage(e.to_string())),
        };

        if caller.nonce <= user.nonce {
            tracing::warn!(
                address = %caller.address,
                stored = user.nonce,
                presented = caller.nonce,
                "Rejected replayed nonce"
            );
            return Err(AuthError::ReplayedNonce {
                stored: user.nonce,
                presented: caller.nonce,
            });
        }

        user.nonce = caller.nonce;
        if let Err(e) = tx.update_user(&user).and_then(|()| tx.commit()) {
            tracing::warn!(
                address = %caller.address,
                nonce = caller.nonce,
                error = %e,
                "Failed to persist nonce; accepting request"
            );
        }

        Ok(caller)
    }
}
