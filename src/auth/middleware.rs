// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! The middleware buffers the request body (the signature covers it),
//! verifies the credentials, then re-attaches the untouched body and a
//! [`VerifiedCaller`] extension before handing the request on.
//!
//! ```rust,ignore
//! let private = Router::new()
//!     .route("/create_project", post(create_project))
//!     .route_layer(middleware::from_fn_with_state(authenticator, require_signed_request));
//! ```

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::authenticator::{Authenticator, Credentials, VerifiedCaller};
use super::AuthError;

/// Largest body accepted on signed routes (1 MiB).
pub const MAX_SIGNED_BODY: usize = 1024 * 1024;

type Check = fn(&Authenticator, &Credentials, &str, &[u8]) -> Result<VerifiedCaller, AuthError>;

/// Full authentication: signature, registered user and fresh nonce.
pub async fn require_signed_request(
    State(authenticator): State<Arc<Authenticator>>,
    request: Request,
    next: Next,
) -> Response {
    verify(&authenticator, request, next, Authenticator::authenticate).await
}

/// Signature check only; used for registration.
pub async fn require_signature(
    State(authenticator): State<Arc<Authenticator>>,
    request: Request,
    next: Next,
) -> Response {
    verify(&authenticator, request, next, Authenticator::verify_signature).await
}

async fn verify(
    authenticator: &Authenticator,
    request: Request,
    next: Next,
    check: Check,
) -> Response {
    let (parts, body) = request.into_parts();

    let credentials = match Credentials::from_headers(&parts.headers) {
        Ok(credentials) => credentials,
        Err(e) => return e.into_response(),
    };

    let bytes = match to_bytes(body, MAX_SIGNED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AuthError::MalformedCredential(format!("unreadable body: {e}")).into_response();
        }
    };

    // Nested routers strip their prefix from `parts.uri`; clients sign the full path.
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_owned())
        .unwrap_or_else(|| parts.uri.path().to_owned());

    match check(authenticator, &credentials, &path, &bytes) {
        Ok(caller) => {
            tracing::debug!(
                address = %caller.address,
                nonce = caller.nonce,
                path = %path,
                "Request authenticated"
            );
            let mut request = Request::from_parts(parts, Body::from(bytes));
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => {
            tracing::info!(
                path = %path,
                error = %e,
                code = e.error_code(),
                "Authentication failed"
            );
            e.into_response()
        }
    }
}
