// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the authenticated caller.
//!
//! Use the `Caller` extractor in handlers mounted behind the signature
//! middleware:
//!
//! ```rust,ignore
//! async fn my_handler(Caller(address): Caller) -> impl IntoResponse {
//!     // address is the verified WalletAddress
//! }
//! ```
//!
//! Handlers that also need the signed nonce take [`VerifiedCaller`] directly.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::authenticator::{VerifiedCaller, SIGNATURE_HEADER};
use super::AuthError;
use crate::models::WalletAddress;

/// Verified wallet address of the request sender.
///
/// The address only ever comes from the [`VerifiedCaller`] extension set by
/// the middleware, never from request data.
pub struct Caller(pub WalletAddress);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = VerifiedCaller::from_request_parts(parts, state).await?;
        Ok(Caller(caller.address))
    }
}

impl<S> FromRequestParts<S> for VerifiedCaller
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedCaller>()
            .cloned()
            .ok_or(AuthError::MissingCredential(SIGNATURE_HEADER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn reads_verified_caller_extension() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        parts.extensions.insert(VerifiedCaller {
            address: WalletAddress::from("0xabc"),
            nonce: 3,
        });

        let Caller(address) = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(address.as_str(), "0xabc");
    }

    #[tokio::test]
    async fn verified_caller_keeps_signed_nonce() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        parts.extensions.insert(VerifiedCaller {
            address: WalletAddress::from("0xabc"),
            nonce: 9,
        });

        let caller = VerifiedCaller::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller.address.as_str(), "0xabc");
        assert_eq!(caller.nonce, 9);
    }

    #[tokio::test]
    async fn rejects_unauthenticated_request() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        let result = Caller::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::MissingCredential(_))));

        let result = VerifiedCaller::from_request_parts(&mut parts, &()).await;
        assert!(matches!(
            result,
            Err(AuthError::MissingCredential(SIGNATURE_HEADER))
        ));
    }
}
