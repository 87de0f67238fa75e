// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet identity primitives.
//!
//! This module provides functionality for:
//! - Generating secp256k1 private keys
//! - Deriving public keys and Ethereum-style wallet addresses
//! - Producing and recovering recoverable message signatures

pub mod keys;
pub mod signing;

pub use keys::{
    address_from_private_key, derive_address, derive_public_key, generate_private_key,
    IdentityError,
};
pub use signing::{recover_address, sign};
