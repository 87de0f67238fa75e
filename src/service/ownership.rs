// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership checks for marketplace resources.
//!
//! Mutations of a project are reserved to its owner and mutations of a bid
//! to its bidder. Failed checks are logged and surface as
//! [`ServiceError::Forbidden`].

use crate::models::{Bid, Project, WalletAddress};

use super::error::{ServiceError, ServiceResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Resource kind used in error messages.
    const KIND: &'static str;

    fn owner(&self) -> &WalletAddress;

    fn resource_id(&self) -> u64;
}

impl OwnedResource for Project {
    const KIND: &'static str = "project";

    fn owner(&self) -> &WalletAddress {
        &self.owner
    }

    fn resource_id(&self) -> u64 {
        self.id
    }
}

impl OwnedResource for Bid {
    const KIND: &'static str = "bid";

    fn owner(&self) -> &WalletAddress {
        &self.user
    }

    fn resource_id(&self) -> u64 {
        self.id
    }
}

/// Trait for enforcing ownership on marketplace operations.
pub trait OwnershipEnforcer {
    /// Verify that `caller` owns this resource before performing `action`.
    fn verify_ownership(&self, caller: &WalletAddress, action: &str) -> ServiceResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, caller: &WalletAddress, action: &str) -> ServiceResult<()> {
        if self.owner() == caller {
            return Ok(());
        }

        tracing::warn!(
            caller = %caller,
            owner = %self.owner(),
            resource = T::KIND,
            id = self.resource_id(),
            action,
            "Ownership check failed"
        );
        Err(ServiceError::forbidden(
            caller,
            format!("{action} {} {}", T::KIND, self.resource_id()),
        ))
    }
}
