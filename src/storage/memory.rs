// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory storage backend.
//!
//! All collections live behind a single mutex that a transaction holds for
//! its whole lifetime, so there is exactly one writer at a time. Beginning a
//! transaction snapshots every collection; rollback restores the snapshot
//! wholesale.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{rate_key, Repository, Storage, StorageError, StorageResult, Transaction, TxGate};
use crate::models::{Bid, Project, Rate, User, WalletAddress};

#[derive(Debug, Clone, Default)]
struct Collections {
    users: Vec<User>,
    projects: Vec<Project>,
    bids: Vec<Bid>,
    rates: Vec<Rate>,
    last_project_id: u64,
    last_bid_id: u64,
    last_rate_id: u64,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Collections>,
    gate: TxGate,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store. Id counters continue after the largest seeded id.
    pub fn with_data(
        users: Vec<User>,
        projects: Vec<Project>,
        bids: Vec<Bid>,
        rates: Vec<Rate>,
    ) -> Self {
        let last_project_id = projects.iter().map(|p| p.id).max().unwrap_or(0);
        let last_bid_id = bids.iter().map(|b| b.id).max().unwrap_or(0);
        let last_rate_id = rates.iter().map(|r| r.id).max().unwrap_or(0);

        Self {
            data: Mutex::new(Collections {
                users,
                projects,
                bids,
                rates,
                last_project_id,
                last_bid_id,
                last_rate_id,
            }),
            gate: TxGate::default(),
        }
    }
}

impl Storage for MemoryStorage {
    fn begin_tx(&self) -> StorageResult<Box<dyn Transaction + '_>> {
        self.gate.check_reentry()?;
        // A panic inside a transaction poisons the lock, but its drop has
        // already restored the snapshot, so the data is consistent.
        let guard = self.data.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovering in-memory storage after a panicked transaction");
            self.data.clear_poison();
            PoisonError::into_inner(poisoned)
        });
        self.gate.enter();

        let snapshot = guard.clone();
        Ok(Box::new(MemoryTransaction {
            gate: &self.gate,
            guard: Some(guard),
            snapshot: Some(snapshot),
        }))
    }
}

struct MemoryTransaction<'a> {
    gate: &'a TxGate,
    guard: Option<MutexGuard<'a, Collections>>,
    snapshot: Option<Collections>,
}

impl<'a> MemoryTransaction<'a> {
    fn data(&mut self) -> StorageResult<&mut Collections> {
        self.guard.as_deref_mut().ok_or(StorageError::NoOpenTransaction)
    }

    fn finish(&mut self) -> StorageResult<(MutexGuard<'a, Collections>, Option<Collections>)> {
        let guard = self.guard.take().ok_or(StorageError::NoOpenTransaction)?;
        self.gate.leave();
        Ok((guard, self.snapshot.take()))
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn commit(&mut self) -> StorageResult<()> {
        let (guard, _snapshot) = self.finish()?;
        drop(guard);
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        let (mut guard, snapshot) = self.finish()?;
        if let Some(snapshot) = snapshot {
            *guard = snapshot;
        }
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if self.guard.is_some() {
            if let Err(e) = self.rollback() {
                tracing::warn!(error = %e, "Failed to roll back in-memory transaction");
            }
        }
    }
}

impl Collections {
    fn user_exists(&self, id: &WalletAddress) -> bool {
        self.users.iter().any(|u| &u.id == id)
    }

    fn project_exists(&self, id: u64) -> bool {
        self.projects.iter().any(|p| p.id == id)
    }

    fn check_project_refs(&self, project: &Project) -> StorageResult<()> {
        if !self.user_exists(&project.owner) {
            return Err(StorageError::InvalidReference(format!(
                "project owner {} does not exist",
                project.owner
            )));
        }
        if let Some(contractor) = &project.contractor {
            if !self.user_exists(contractor) {
                return Err(StorageError::InvalidReference(format!(
                    "project contractor {contractor} does not exist"
                )));
            }
        }
        Ok(())
    }

    fn check_bid_refs(&self, bid: &Bid) -> StorageResult<()> {
        if !self.project_exists(bid.project) {
            return Err(StorageError::InvalidReference(format!(
                "bid project {} does not exist",
                bid.project
            )));
        }
        if !self.user_exists(&bid.user) {
            return Err(StorageError::InvalidReference(format!(
                "bid user {} does not exist",
                bid.user
            )));
        }
        Ok(())
    }
}

impl Repository for MemoryTransaction<'_> {
    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    fn create_user(&mut self, user: &User) -> StorageResult<()> {
        let data = self.data()?;
        if data.user_exists(&user.id) {
            return Err(StorageError::already_exists("user", &user.id));
        }
        data.users.push(user.clone());
        Ok(())
    }

    fn get_user(&mut self, id: &WalletAddress) -> StorageResult<User> {
        self.data()?
            .users
            .iter()
            .find(|u| &u.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("user", id))
    }

    fn update_user(&mut self, user: &User) -> StorageResult<()> {
        let stored = self
            .data()?
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StorageError::not_found("user", &user.id))?;
        *stored = user.clone();
        Ok(())
    }

    fn delete_user(&mut self, id: &WalletAddress) -> StorageResult<()> {
        let data = self.data()?;
        let index = data
            .users
            .iter()
            .position(|u| &u.id == id)
            .ok_or_else(|| StorageError::not_found("user", id))?;

        let referenced = data
            .projects
            .iter()
            .any(|p| &p.owner == id || p.contractor.as_ref() == Some(id))
            || data.bids.iter().any(|b| &b.user == id)
            || data
                .rates
                .iter()
                .any(|r| &r.evaluator == id || &r.evaluated == id);
        if referenced {
            return Err(StorageError::InvalidReference(format!("user {id} is still referenced")));
        }

        data.users.remove(index);
        Ok(())
    }

    fn list_users(&mut self) -> StorageResult<Vec<User>> {
        Ok(self.data()?.users.clone())
    }

    // -------------------------------------------------------------------------
    // Projects
    // -------------------------------------------------------------------------

    fn create_project(&mut self, project: &Project) -> StorageResult<u64> {
        let data = self.data()?;
        data.check_project_refs(project)?;

        data.last_project_id += 1;
        let mut stored = project.clone();
        stored.id = data.last_project_id;
        data.projects.push(stored);
        Ok(data.last_project_id)
    }

    fn get_project(&mut self, id: u64) -> StorageResult<Project> {
        self.data()?
            .projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("project", id))
    }

    fn update_project(&mut self, project: &Project) -> StorageResult<()> {
        let data = self.data()?;
        let index = data
            .projects
            .iter()
            .position(|p| p.id == project.id)
            .ok_or_else(|| StorageError::not_found("project", project.id))?;
        data.check_project_refs(project)?;

        data.projects[index] = project.clone();
        Ok(())
    }

    fn delete_project(&mut self, id: u64) -> StorageResult<()> {
        let data = self.data()?;
        let index = data
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StorageError::not_found("project", id))?;

        if data.bids.iter().any(|b| b.project == id)
            || data.rates.iter().any(|r| r.project == id)
        {
            return Err(StorageError::InvalidReference(format!(
                "project {id} is still referenced"
            )));
        }

        data.projects.remove(index);
        Ok(())
    }

    fn list_projects(&mut self) -> StorageResult<Vec<Project>> {
        Ok(self.data()?.projects.clone())
    }

    fn user_projects(&mut self, owner: &WalletAddress) -> StorageResult<Vec<Project>> {
        Ok(self
            .data()?
            .projects
            .iter()
            .filter(|p| &p.owner == owner)
            .cloned()
            .collect())
    }

    // -------------------------------------------------------------------------
    // Bids
    // -------------------------------------------------------------------------

    fn create_bid(&mut self, bid: &Bid) -> StorageResult<u64> {
        let data = self.data()?;
        data.check_bid_refs(bid)?;

        data.last_bid_id += 1;
        let mut stored = bid.clone();
        stored.id = data.last_bid_id;
        data.bids.push(stored);
        Ok(data.last_bid_id)
    }

    fn get_bid(&mut self, id: u64) -> StorageResult<Bid> {
        self.data()?
            .bids
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("bid", id))
    }

    fn update_bid(&mut self, bid: &Bid) -> StorageResult<()> {
        let data = self.data()?;
        let index = data
            .bids
            .iter()
            .position(|b| b.id == bid.id)
            .ok_or_else(|| StorageError::not_found("bid", bid.id))?;
        data.check_bid_refs(bid)?;

        data.bids[index] = bid.clone();
        Ok(())
    }

    fn delete_bid(&mut self, id: u64) -> StorageResult<()> {
        let data = self.data()?;
        let index = data
            .bids
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| StorageError::not_found("bid", id))?;
        data.bids.remove(index);
        Ok(())
    }

    fn project_bids(&mut self, project: u64) -> StorageResult<Vec<Bid>> {
        Ok(self
            .data()?
            .bids
            .iter()
            .filter(|b| b.project == project)
            .cloned()
            .collect())
    }

    // -------------------------------------------------------------------------
    // Rates
    // -------------------------------------------------------------------------

    fn create_rate(&mut self, rate: &Rate) -> StorageResult<u64> {
        let data = self.data()?;
        if !data.project_exists(rate.project) {
            return Err(StorageError::InvalidReference(format!(
                "rated project {} does not exist",
                rate.project
            )));
        }
        for party in [&rate.evaluator, &rate.evaluated] {
            if !data.user_exists(party) {
                return Err(StorageError::InvalidReference(format!(
                    "rate party {party} does not exist"
                )));
            }
        }
        if data
            .rates
            .iter()
            .any(|r| r.evaluator == rate.evaluator && r.project == rate.project)
        {
            return Err(StorageError::already_exists(
                "rate",
                rate_key(&rate.evaluator, rate.project),
            ));
        }

        data.last_rate_id += 1;
        let mut stored = rate.clone();
        stored.id = data.last_rate_id;
        data.rates.push(stored);
        Ok(data.last_rate_id)
    }

    fn get_rate(&mut self, id: u64) -> StorageResult<Rate> {
        self.data()?
            .rates
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("rate", id))
    }

    fn delete_rate(&mut self, id: u64) -> StorageResult<()> {
        let data = self.data()?;
        let index = data
            .rates
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StorageError::not_found("rate", id))?;
        data.rates.remove(index);
        Ok(())
    }

    fn evaluator_rates(&mut self, evaluator: &WalletAddress) -> StorageResult<Vec<Rate>> {
        Ok(self
            .data()?
            .rates
            .iter()
            .filter(|r| &r.evaluator == evaluator)
            .cloned()
            .collect())
    }

    fn evaluated_rates(&mut self, evaluated: &WalletAddress) -> StorageResult<Vec<Rate>> {
        Ok(self
            .data()?
            .rates
            .iter()
            .filter(|r| &r.evaluated == evaluated)
            .cloned()
            .collect())
    }
}
