// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Marketplace business logic: authorization, the project lifecycle and
//! transactional updates across storage.

pub mod error;
pub mod lifecycle;
pub mod marketplace;
pub mod ownership;

pub use error::{ServiceError, ServiceResult};
pub use lifecycle::ProjectEvent;
pub use marketplace::Marketplace;
pub use ownership::{OwnedResource, OwnershipEnforcer};
