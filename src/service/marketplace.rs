// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Marketplace operations over users, projects, bids and rates.
//!
//! Every mutating operation follows the same shape:
//!
//! ```text
//! begin_tx → read → authorize → validate → write → commit
//! ```
//!
//! Any early return drops the transaction, which rolls it back, so a failed
//! operation never leaves a partial write behind. `caller` is always the
//! address verified by the authentication layer.

use std::sync::Arc;

use chrono::Utc;

use crate::models::{
    Bid, BidTerms, NewBid, NewProject, Project, ProjectStatus, ProjectUpdate, Rate, RateRequest,
    User, UserRates, WalletAddress,
};
use crate::storage::{Storage, StorageExt, Transaction};

use super::error::{ServiceError, ServiceResult};
use super::lifecycle::ProjectEvent;
use super::ownership::OwnershipEnforcer;

/// Lowest and highest accepted rate values.
pub const RATE_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

pub struct Marketplace {
    storage: Arc<dyn Storage>,
}

impl Marketplace {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Run `f` in one transaction and commit if it succeeds.
    fn transact<T>(
        &self,
        f: impl FnOnce(&mut dyn Transaction) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let mut tx = self.storage.begin_tx()?;
        let value = f(tx.as_mut())?;
        tx.commit()?;
        Ok(value)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn user_list(&self) -> ServiceResult<Vec<User>> {
        Ok(self.storage.with_tx(|tx| tx.list_users())?)
    }

    pub fn user(&self, id: &WalletAddress) -> ServiceResult<User> {
        Ok(self.storage.with_tx(|tx| tx.get_user(id))?)
    }

    pub fn project_list(&self) -> ServiceResult<Vec<Project>> {
        Ok(self.storage.with_tx(|tx| tx.list_projects())?)
    }

    /// Projects owned by a user.
    pub fn user_projects(&self, id: &WalletAddress) -> ServiceResult<Vec<Project>> {
        Ok(self.storage.with_tx(|tx| {
            tx.get_user(id)?;
            tx.user_projects(id)
        })?)
    }

    pub fn project(&self, id: u64) -> ServiceResult<Project> {
        Ok(self.storage.with_tx(|tx| tx.get_project(id))?)
    }

    pub fn bid(&self, id: u64) -> ServiceResult<Bid> {
        Ok(self.storage.with_tx(|tx| tx.get_bid(id))?)
    }

    pub fn project_bids(&self, project_id: u64) -> ServiceResult<Vec<Bid>> {
        Ok(self.storage.with_tx(|tx| {
            tx.get_project(project_id)?;
            tx.project_bids(project_id)
        })?)
    }

    /// Rates a user has given and received.
    pub fn user_rates(&self, id: &WalletAddress) -> ServiceResult<UserRates> {
        Ok(self.storage.with_tx(|tx| {
            tx.get_user(id)?;
            Ok(UserRates {
                given: tx.evaluator_rates(id)?,
                received: tx.evaluated_rates(id)?,
            })
        })?)
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn add_user(&self, caller: &WalletAddress, user: User) -> ServiceResult<()> {
        if &user.id != caller {
            tracing::warn!(caller = %caller, user = %user.id, "Refused to register other address");
            return Err(ServiceError::forbidden(caller, format!("register {}", user.id)));
        }
        if user.nickname.trim().is_empty() {
            return Err(ServiceError::Validation("nickname must not be empty".into()));
        }

        self.transact(|tx| Ok(tx.create_user(&user)?))?;
        tracing::info!(user = %user.id, "User registered");
        Ok(())
    }

    pub fn update_user_nonce(&self, id: &WalletAddress, nonce: u64) -> ServiceResult<()> {
        self.transact(|tx| {
            let mut user = tx.get_user(id)?;
            user.nonce = nonce;
            Ok(tx.update_user(&user)?)
        })
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub fn create_project(
        &self,
        caller: &WalletAddress,
        request: NewProject,
    ) -> ServiceResult<u64> {
        let owner = request.owner.unwrap_or_else(|| caller.clone());
        if &owner != caller {
            tracing::warn!(caller = %caller, owner = %owner, "Refused project for another owner");
            return Err(ServiceError::forbidden(
                caller,
                format!("create a project owned by {owner}"),
            ));
        }
        validate_title(&request.title)?;

        let project = Project {
            id: 0,
            title: request.title,
            description: request.description,
            tags: request.tags,
            created: Utc::now(),
            status: ProjectStatus::Open,
            owner,
            contractor: None,
            started: None,
            deadline: request.deadline,
            price: request.price,
        };

        let id = self.transact(|tx| Ok(tx.create_project(&project)?))?;
        tracing::info!(project_id = id, owner = %caller, "Project created");
        Ok(id)
    }

    pub fn update_project(
        &self,
        caller: &WalletAddress,
        id: u64,
        update: ProjectUpdate,
    ) -> ServiceResult<()> {
        validate_title(&update.title)?;

        self.transact(|tx| {
            let mut project = tx.get_project(id)?;
            project.verify_ownership(caller, "update")?;
            require_open(&project)?;

            project.title = update.title;
            project.description = update.description;
            project.tags = update.tags;
            project.deadline = update.deadline;
            project.price = update.price;
            Ok(tx.update_project(&project)?)
        })
    }

    /// Delete an open project together with its bids.
    pub fn delete_project(&self, caller: &WalletAddress, id: u64) -> ServiceResult<()> {
        self.transact(|tx| {
            let project = tx.get_project(id)?;
            project.verify_ownership(caller, "delete")?;
            require_open(&project)?;

            for bid in tx.project_bids(id)? {
                tx.delete_bid(bid.id)?;
            }
            Ok(tx.delete_project(id)?)
        })?;

        tracing::info!(project_id = id, owner = %caller, "Project deleted");
        Ok(())
    }

    // =========================================================================
    // Bids
    // =========================================================================

    pub fn create_bid(
        &self,
        caller: &WalletAddress,
        project_id: u64,
        request: NewBid,
    ) -> ServiceResult<u64> {
        let bidder = request.user.unwrap_or_else(|| caller.clone());
        if &bidder != caller {
            tracing::warn!(caller = %caller, bidder = %bidder, "Refused to bid for another user");
            return Err(ServiceError::forbidden(caller, format!("bid as {bidder}")));
        }

        let id = self.transact(|tx| {
            let project = tx.get_project(project_id)?;
            tx.get_user(&bidder)?;

            if &project.owner == caller {
                tracing::warn!(caller = %caller, project_id, "Owner tried to bid on own project");
                return Err(ServiceError::forbidden(
                    caller,
                    format!("bid on own project {project_id}"),
                ));
            }
            require_open(&project)?;

            let bid = Bid {
                id: 0,
                project: project_id,
                user: bidder,
                price: request.price,
                deadline: request.deadline,
                message: request.message,
            };
            Ok(tx.create_bid(&bid)?)
        })?;

        tracing::info!(bid_id = id, project_id, bidder = %caller, "Bid placed");
        Ok(id)
    }

    pub fn update_bid(
        &self,
        caller: &WalletAddress,
        id: u64,
        terms: BidTerms,
    ) -> ServiceResult<()> {
        self.transact(|tx| {
            let mut bid = tx.get_bid(id)?;
            bid.verify_ownership(caller, "update")?;

            bid.price = terms.price;
            bid.deadline = terms.deadline;
            bid.message = terms.message;
            Ok(tx.update_bid(&bid)?)
        })
    }

    pub fn delete_bid(&self, caller: &WalletAddress, id: u64) -> ServiceResult<()> {
        self.transact(|tx| {
            let bid = tx.get_bid(id)?;
            bid.verify_ownership(caller, "withdraw")?;
            Ok(tx.delete_bid(id)?)
        })
    }

    /// Assign the bidder as contractor and start the project.
    ///
    /// Only the accepted bid is removed; other bids on the project stay.
    /// Returns the id of the started project.
    pub fn accept_bid(&self, caller: &WalletAddress, bid_id: u64) -> ServiceResult<u64> {
        let project_id = self.transact(|tx| {
            let bid = tx.get_bid(bid_id)?;
            let mut project = tx.get_project(bid.project)?;
            project.verify_ownership(caller, "accept a bid on")?;
            project.status = next_status(&project, ProjectEvent::AcceptBid)?;

            project.contractor = Some(bid.user.clone());
            project.deadline = bid.deadline;
            project.price = bid.price;
            project.started = Some(Utc::now());

            tx.update_project(&project)?;
            tx.delete_bid(bid_id)?;
            Ok(project.id)
        })?;

        tracing::info!(project_id, bid_id, owner = %caller, "Bid accepted");
        Ok(project_id)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Contractor hands the work in for review.
    pub fn set_project_ready(&self, caller: &WalletAddress, id: u64) -> ServiceResult<()> {
        self.fire(id, ProjectEvent::SetReady, |project| {
            require_party(caller, project.contractor.as_ref(), project, "set ready")
        })
    }

    /// Owner accepts the delivered work.
    pub fn accept_project(&self, caller: &WalletAddress, id: u64) -> ServiceResult<()> {
        self.fire(id, ProjectEvent::Accept, |project| {
            require_party(caller, Some(&project.owner), project, "accept")
        })
    }

    /// Either party abandons a project in progress.
    pub fn cancel_project(&self, caller: &WalletAddress, id: u64) -> ServiceResult<()> {
        self.fire(id, ProjectEvent::Cancel, |project| {
            if is_party(caller, project) {
                return Ok(());
            }
            tracing::warn!(
                caller = %caller,
                project_id = project.id,
                "Cancel refused for non-party"
            );
            Err(ServiceError::forbidden(caller, format!("cancel project {}", project.id)))
        })
    }

    /// Apply `event` to a project once `authorize` has accepted the caller.
    fn fire(
        &self,
        id: u64,
        event: ProjectEvent,
        authorize: impl FnOnce(&Project) -> ServiceResult<()>,
    ) -> ServiceResult<()> {
        let status = self.transact(|tx| {
            let mut project = tx.get_project(id)?;
            authorize(&project)?;
            project.status = next_status(&project, event)?;
            tx.update_project(&project)?;
            Ok(project.status)
        })?;

        tracing::info!(project_id = id, %status, "Project status changed");
        Ok(())
    }

    // =========================================================================
    // Rates
    // =========================================================================

    /// Rate the other party of a finished project. Returns the rate id.
    pub fn rate_project(
        &self,
        caller: &WalletAddress,
        project_id: u64,
        request: RateRequest,
    ) -> ServiceResult<u64> {
        if !RATE_RANGE.contains(&request.value) {
            return Err(ServiceError::Validation(format!(
                "rate value {} outside {}..={}",
                request.value,
                RATE_RANGE.start(),
                RATE_RANGE.end()
            )));
        }

        self.transact(|tx| {
            let project = tx.get_project(project_id)?;
            if !is_party(caller, &project) {
                tracing::warn!(caller = %caller, project_id, "Rate refused for non-party");
                return Err(ServiceError::forbidden(caller, format!("rate project {project_id}")));
            }
            if !project.status.is_terminal() {
                return Err(ServiceError::Conflict(format!(
                    "project {project_id} is {}, only finished projects can be rated",
                    project.status
                )));
            }

            let counterpart = if caller == &project.owner {
                project.contractor.clone()
            } else {
                Some(project.owner.clone())
            };
            let evaluated = match counterpart {
                Some(evaluated) => evaluated,
                None if project.status == ProjectStatus::Completed => {
                    // Completion requires an accepted bid.
                    tracing::error!(project_id, "Completed project has no contractor");
                    return Err(ServiceError::Internal(format!(
                        "completed project {project_id} has no contractor"
                    )));
                }
                None => {
                    return Err(ServiceError::Conflict(format!(
                        "project {project_id} was canceled before any work started"
                    )));
                }
            };

            let rate = Rate {
                id: 0,
                project: project_id,
                evaluator: caller.clone(),
                evaluated,
                value: request.value,
                message: request.message,
            };
            Ok(tx.create_rate(&rate)?)
        })
    }
}

fn validate_title(title: &str) -> ServiceResult<()> {
    if title.trim().is_empty() {
        return Err(ServiceError::Validation("project title must not be empty".into()));
    }
    Ok(())
}

fn require_open(project: &Project) -> ServiceResult<()> {
    if project.status != ProjectStatus::Open {
        return Err(ServiceError::Conflict(format!(
            "project {} is {}, expected open",
            project.id, project.status
        )));
    }
    Ok(())
}

fn next_status(project: &Project, event: ProjectEvent) -> ServiceResult<ProjectStatus> {
    project
        .status
        .transition(event)
        .ok_or(ServiceError::InvalidStateTransition {
            id: project.id,
            from: project.status,
            event,
        })
}

fn is_party(caller: &WalletAddress, project: &Project) -> bool {
    &project.owner == caller || project.contractor.as_ref() == Some(caller)
}

fn require_party(
    caller: &WalletAddress,
    party: Option<&WalletAddress>,
    project: &Project,
    action: &str,
) -> ServiceResult<()> {
    if party == Some(caller) {
        return Ok(());
    }
    tracing::warn!(caller = %caller, project_id = project.id, action, "Lifecycle change refused");
    Err(ServiceError::forbidden(caller, format!("{action} project {}", project.id)))
}
