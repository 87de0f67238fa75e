// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::WalletAddress;

/// Authentication error type.
///
/// Every variant except [`AuthError::Storage`] tells the client to prove its
/// identity again and maps to `401 Unauthorized`.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// A credential header is absent
    MissingCredential(&'static str),
    /// A credential header or the request body cannot be parsed
    MalformedCredential(String),
    /// Signature does not recover to the claimed address
    InvalidSignature,
    /// No registered user for the claimed address
    UnknownIdentity(WalletAddress),
    /// Nonce not greater than the last accepted one
    ReplayedNonce { stored: u64, presented: u64 },
    /// Storage failed while checking the nonce
    Storage(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential(_) => "missing_credential",
            AuthError::MalformedCredential(_) => "malformed_credential",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::UnknownIdentity(_) => "unknown_identity",
            AuthError::ReplayedNonce { .. } => "replayed_nonce",
            AuthError::Storage(_) => "storage_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential(_)
            | AuthError::MalformedCredential(_)
            | AuthError::InvalidSignature
            | AuthError::UnknownIdentity(_)
            | AuthError::ReplayedNonce { .. } => StatusCode::UNAUTHORIZED,
            AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredential(header) => write!(f, "{header} header is required"),
            AuthError::MalformedCredential(msg) => write!(f, "Malformed credential: {msg}"),
            AuthError::InvalidSignature => write!(f, "Signature does not match the wallet address"),
            AuthError::UnknownIdentity(address) => write!(f, "Wallet {address} is not registered"),
            AuthError::ReplayedNonce { stored, presented } => {
                write!(f, "Nonce {presented} must be greater than {stored}")
            }
            AuthError::Storage(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
