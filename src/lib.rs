// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Market - Wallet-Identity Freelance Marketplace
//!
//! Users are wallet addresses. Private requests are signed with the wallet
//! key and carry a strictly increasing nonce, so the service keeps no
//! sessions.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Wallet-signature authentication with nonce replay protection
//! - `blockchain` - secp256k1 keys, addresses and recoverable signatures
//! - `service` - Marketplace rules: ownership and project lifecycle
//! - `storage` - Transactional storage contract (in-memory and redb)

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod state;
pub mod storage;
