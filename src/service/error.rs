// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::models::{ProjectStatus, WalletAddress};
use crate::service::lifecycle::ProjectEvent;
use crate::storage::StorageError;

/// Errors returned by marketplace operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{caller} is not allowed to {reason}")]
    Forbidden {
        caller: WalletAddress,
        reason: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("project {id} cannot {event} while {from}")]
    InvalidStateTransition {
        id: u64,
        from: ProjectStatus,
        event: ProjectEvent,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub(crate) fn forbidden(caller: &WalletAddress, reason: impl Into<String>) -> Self {
        ServiceError::Forbidden {
            caller: caller.clone(),
            reason: reason.into(),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound { .. } => ServiceError::NotFound(error.to_string()),
            StorageError::AlreadyExists { .. } | StorageError::InvalidReference(_) => {
                ServiceError::Conflict(error.to_string())
            }
            other => ServiceError::Storage(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
