// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Stateless wallet-signature authentication for the marketplace API.
//!
//! ## Auth Flow
//!
//! 1. Client builds `<path>&<nonce>&<body>` and signs it with its wallet key
//! 2. Client sends `X-Wallet-Address`, `X-Wallet-Nonce`, `X-Wallet-Signature`
//! 3. Server:
//!    - Recovers the signer address and compares it with the claimed one
//!    - Loads the registered user for that address
//!    - Requires the nonce to be greater than the stored nonce
//!    - Stores the new nonce
//! 4. Handlers receive the verified address through the `Caller` extractor
//!
//! ## Security
//!
//! - No sessions or tokens; every request carries its own proof
//! - Replays are rejected by the per-address nonce
//! - Registration checks the signature only, since no nonce is stored yet

pub mod authenticator;
pub mod error;
pub mod extractor;
pub mod middleware;

pub use authenticator::{
    signed_payload, Authenticator, Credentials, VerifiedCaller, ADDRESS_HEADER, NONCE_HEADER,
    SIGNATURE_HEADER,
};
pub use error::AuthError;
pub use extractor::Caller;
pub use middleware::{require_signature, require_signed_request};
