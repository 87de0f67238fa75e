// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::models::WalletAddress;
use crate::service::Marketplace;
use crate::storage::{MemoryStorage, Storage};

/// Shared handles injected into every handler.
///
/// Marketplace and authenticator work on the same storage handle.
#[derive(Clone)]
pub struct AppState {
    pub marketplace: Arc<Marketplace>,
    pub authenticator: Arc<Authenticator>,
    /// Wallet address the service publishes at `/api/public/config`.
    pub service_address: WalletAddress,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, service_address: WalletAddress) -> Self {
        Self {
            marketplace: Arc::new(Marketplace::new(Arc::clone(&storage))),
            authenticator: Arc::new(Authenticator::new(storage)),
            service_address,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), WalletAddress::default())
    }
}
