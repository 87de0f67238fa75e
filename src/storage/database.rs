// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable storage backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: wallet address → serialized User
//! - `projects`: project id → serialized Project
//! - `bids`: bid id → serialized Bid
//! - `rates`: rate id → serialized Rate
//! - `rate_index`: `evaluator|project` → rate id (one rate per pair)
//! - `counters`: entity name → last issued id
//!
//! Every storage transaction is one redb write transaction. redb allows a
//! single writer at a time, so `begin_tx` on another thread blocks until the
//! current transaction commits or aborts. Reference checks run inside the
//! write transaction before anything is written.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    rate_key, Repository, Storage, StorageError, StorageResult, Transaction, TxGate,
};
use crate::models::{Bid, Project, Rate, User, WalletAddress};

// =============================================================================
// Table Definitions
// =============================================================================

type EntityTable = TableDefinition<'static, u64, &'static [u8]>;

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const PROJECTS: EntityTable = TableDefinition::new("projects");
const BIDS: EntityTable = TableDefinition::new("bids");
const RATES: EntityTable = TableDefinition::new("rates");

/// Uniqueness index: `evaluator|project` → rate id.
const RATE_INDEX: TableDefinition<&str, u64> = TableDefinition::new("rate_index");

/// Last issued id per entity table.
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

// =============================================================================
// DatabaseStorage
// =============================================================================

pub struct DatabaseStorage {
    db: Database,
    gate: TxGate,
}

impl DatabaseStorage {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so reads in a fresh database don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(PROJECTS)?;
            let _ = write_txn.open_table(BIDS)?;
            let _ = write_txn.open_table(RATES)?;
            let _ = write_txn.open_table(RATE_INDEX)?;
            let _ = write_txn.open_table(COUNTERS)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Opened marketplace database");
        Ok(Self {
            db,
            gate: TxGate::default(),
        })
    }
}

impl Storage for DatabaseStorage {
    fn begin_tx(&self) -> StorageResult<Box<dyn Transaction + '_>> {
        self.gate.check_reentry()?;
        let txn = self.db.begin_write()?;
        self.gate.enter();

        Ok(Box::new(DatabaseTransaction {
            gate: &self.gate,
            txn: Some(txn),
        }))
    }
}

struct DatabaseTransaction<'a> {
    gate: &'a TxGate,
    txn: Option<WriteTransaction>,
}

impl DatabaseTransaction<'_> {
    fn txn(&self) -> StorageResult<&WriteTransaction> {
        self.txn.as_ref().ok_or(StorageError::NoOpenTransaction)
    }

    fn finish(&mut self) -> StorageResult<WriteTransaction> {
        let txn = self.txn.take().ok_or(StorageError::NoOpenTransaction)?;
        self.gate.leave();
        Ok(txn)
    }
}

impl Transaction for DatabaseTransaction<'_> {
    fn commit(&mut self) -> StorageResult<()> {
        self.finish()?.commit()?;
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        self.finish()?.abort()?;
        Ok(())
    }
}

impl Drop for DatabaseTransaction<'_> {
    fn drop(&mut self) {
        if self.txn.is_some() {
            if let Err(e) = self.rollback() {
                tracing::warn!(error = %e, "Failed to abort database transaction");
            }
        }
    }
}

// =============================================================================
// Table Helpers
// =============================================================================

fn read_entity<T: DeserializeOwned>(
    txn: &WriteTransaction,
    def: EntityTable,
    id: u64,
) -> StorageResult<Option<T>> {
    let table = txn.open_table(def)?;
    let entity = match table.get(id)? {
        Some(value) => Some(serde_json::from_slice(value.value())?),
        None => None,
    };
    Ok(entity)
}

fn write_entity<T: Serialize>(
    txn: &WriteTransaction,
    def: EntityTable,
    id: u64,
    entity: &T,
) -> StorageResult<()> {
    let json = serde_json::to_vec(entity)?;
    let mut table = txn.open_table(def)?;
    table.insert(id, json.as_slice())?;
    Ok(())
}

fn remove_entity(txn: &WriteTransaction, def: EntityTable, id: u64) -> StorageResult<bool> {
    let mut table = txn.open_table(def)?;
    let removed = table.remove(id)?.is_some();
    Ok(removed)
}

fn list_entities<T: DeserializeOwned>(
    txn: &WriteTransaction,
    def: EntityTable,
) -> StorageResult<Vec<T>> {
    let table = txn.open_table(def)?;
    let mut entities = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        entities.push(serde_json::from_slice(value.value())?);
    }
    Ok(entities)
}

fn read_user(txn: &WriteTransaction, id: &WalletAddress) -> StorageResult<Option<User>> {
    let table = txn.open_table(USERS)?;
    let user = match table.get(id.as_str())? {
        Some(value) => Some(serde_json::from_slice(value.value())?),
        None => None,
    };
    Ok(user)
}

fn write_user(txn: &WriteTransaction, user: &User) -> StorageResult<()> {
    let json = serde_json::to_vec(user)?;
    let mut table = txn.open_table(USERS)?;
    table.insert(user.id.as_str(), json.as_slice())?;
    Ok(())
}

fn next_id(txn: &WriteTransaction, counter: &str) -> StorageResult<u64> {
    let mut table = txn.open_table(COUNTERS)?;
    let last = table.get(counter)?.map(|value| value.value()).unwrap_or(0);
    let id = last + 1;
    table.insert(counter, id)?;
    Ok(id)
}

fn user_exists(txn: &WriteTransaction, id: &WalletAddress) -> StorageResult<bool> {
    let table = txn.open_table(USERS)?;
    let exists = table.get(id.as_str())?.is_some();
    Ok(exists)
}

fn project_exists(txn: &WriteTransaction, id: u64) -> StorageResult<bool> {
    let table = txn.open_table(PROJECTS)?;
    let exists = table.get(id)?.is_some();
    Ok(exists)
}

fn check_project_refs(txn: &WriteTransaction, project: &Project) -> StorageResult<()> {
    if !user_exists(txn, &project.owner)? {
        return Err(StorageError::InvalidReference(format!(
            "project owner {} does not exist",
            project.owner
        )));
    }
    if let Some(contractor) = &project.contractor {
        if !user_exists(txn, contractor)? {
            return Err(StorageError::InvalidReference(format!(
                "project contractor {contractor} does not exist"
            )));
        }
    }
    Ok(())
}

fn check_bid_refs(txn: &WriteTransaction, bid: &Bid) -> StorageResult<()> {
    if !project_exists(txn, bid.project)? {
        return Err(StorageError::InvalidReference(format!(
            "bid project {} does not exist",
            bid.project
        )));
    }
    if !user_exists(txn, &bid.user)? {
        return Err(StorageError::InvalidReference(format!(
            "bid user {} does not exist",
            bid.user
        )));
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

impl Repository for DatabaseTransaction<'_> {
    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    fn create_user(&mut self, user: &User) -> StorageResult<()> {
        let txn = self.txn()?;
        if user_exists(txn, &user.id)? {
            return Err(StorageError::already_exists("user", &user.id));
        }
        write_user(txn, user)
    }

    fn get_user(&mut self, id: &WalletAddress) -> StorageResult<User> {
        read_user(self.txn()?, id)?.ok_or_else(|| StorageError::not_found("user", id))
    }

    fn update_user(&mut self, user: &User) -> StorageResult<()> {
        let txn = self.txn()?;
        if !user_exists(txn, &user.id)? {
            return Err(StorageError::not_found("user", &user.id));
        }
        write_user(txn, user)
    }

    fn delete_user(&mut self, id: &WalletAddress) -> StorageResult<()> {
        let txn = self.txn()?;
        if !user_exists(txn, id)? {
            return Err(StorageError::not_found("user", id));
        }

        let projects: Vec<Project> = list_entities(txn, PROJECTS)?;
        let bids: Vec<Bid> = list_entities(txn, BIDS)?;
        let rates: Vec<Rate> = list_entities(txn, RATES)?;
        let referenced = projects
            .iter()
            .any(|p| &p.owner == id || p.contractor.as_ref() == Some(id))
            || bids.iter().any(|b| &b.user == id)
            || rates.iter().any(|r| &r.evaluator == id || &r.evaluated == id);
        if referenced {
            return Err(StorageError::InvalidReference(format!(
                "user {id} is still referenced"
            )));
        }

        let mut table = txn.open_table(USERS)?;
        table.remove(id.as_str())?;
        Ok(())
    }

    fn list_users(&mut self) -> StorageResult<Vec<User>> {
        let table = self.txn()?.open_table(USERS)?;
        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            users.push(serde_json::from_slice(value.value())?);
        }
        Ok(users)
    }

    // -------------------------------------------------------------------------
    // Projects
    // -------------------------------------------------------------------------

    fn create_project(&mut self, project: &Project) -> StorageResult<u64> {
        let txn = self.txn()?;
        check_project_refs(txn, project)?;

        let id = next_id(txn, "projects")?;
        let mut stored = project.clone();
        stored.id = id;
        write_entity(txn, PROJECTS, id, &stored)?;
        Ok(id)
    }

    fn get_project(&mut self, id: u64) -> StorageResult<Project> {
        read_entity(self.txn()?, PROJECTS, id)?
            .ok_or_else(|| StorageError::not_found("project", id))
    }

    fn update_project(&mut self, project: &Project) -> StorageResult<()> {
        let txn = self.txn()?;
        if !project_exists(txn, project.id)? {
            return Err(StorageError::not_found("project", project.id));
        }
        check_project_refs(txn, project)?;
        write_entity(txn, PROJECTS, project.id, project)
    }

    fn delete_project(&mut self, id: u64) -> StorageResult<()> {
        let txn = self.txn()?;
        if !project_exists(txn, id)? {
            return Err(StorageError::not_found("project", id));
        }

        let bids: Vec<Bid> = list_entities(txn, BIDS)?;
        let rates: Vec<Rate> = list_entities(txn, RATES)?;
        if bids.iter().any(|b| b.project == id) || rates.iter().any(|r| r.project == id) {
            return Err(StorageError::InvalidReference(format!(
                "project {id} is still referenced"
            )));
        }

        remove_entity(txn, PROJECTS, id)?;
        Ok(())
    }

    fn list_projects(&mut self) -> StorageResult<Vec<Project>> {
        list_entities(self.txn()?, PROJECTS)
    }

    fn user_projects(&mut self, owner: &WalletAddress) -> StorageResult<Vec<Project>> {
        let projects: Vec<Project> = list_entities(self.txn()?, PROJECTS)?;
        Ok(projects.into_iter().filter(|p| &p.owner == owner).collect())
    }

    // -------------------------------------------------------------------------
    // Bids
    // -------------------------------------------------------------------------

    fn create_bid(&mut self, bid: &Bid) -> StorageResult<u64> {
        let txn = self.txn()?;
        check_bid_refs(txn, bid)?;

        let id = next_id(txn, "bids")?;
        let mut stored = bid.clone();
        stored.id = id;
        write_entity(txn, BIDS, id, &stored)?;
        Ok(id)
    }

    fn get_bid(&mut self, id: u64) -> StorageResult<Bid> {
        read_entity(self.txn()?, BIDS, id)?.ok_or_else(|| StorageError::not_found("bid", id))
    }

    fn update_bid(&mut self, bid: &Bid) -> StorageResult<()> {
        let txn = self.txn()?;
        if read_entity::<Bid>(txn, BIDS, bid.id)?.is_none() {
            return Err(StorageError::not_found("bid", bid.id));
        }
        check_bid_refs(txn, bid)?;
        write_entity(txn, BIDS, bid.id, bid)
    }

    fn delete_bid(&mut self, id: u64) -> StorageResult<()> {
        if !remove_entity(self.txn()?, BIDS, id)? {
            return Err(StorageError::not_found("bid", id));
        }
        Ok(())
    }

    fn project_bids(&mut self, project: u64) -> StorageResult<Vec<Bid>> {
        let bids: Vec<Bid> = list_entities(self.txn()?, BIDS)?;
        Ok(bids.into_iter().filter(|b| b.project == project).collect())
    }

    // -------------------------------------------------------------------------
    // Rates
    // -------------------------------------------------------------------------

    fn create_rate(&mut self, rate: &Rate) -> StorageResult<u64> {
        let txn = self.txn()?;
        if !project_exists(txn, rate.project)? {
            return Err(StorageError::InvalidReference(format!(
                "rated project {} does not exist",
                rate.project
            )));
        }
        for party in [&rate.evaluator, &rate.evaluated] {
            if !user_exists(txn, party)? {
                return Err(StorageError::InvalidReference(format!(
                    "rate party {party} does not exist"
                )));
            }
        }

        let key = rate_key(&rate.evaluator, rate.project);
        let mut index = txn.open_table(RATE_INDEX)?;
        if index.get(key.as_str())?.is_some() {
            return Err(StorageError::already_exists("rate", key));
        }

        let id = next_id(txn, "rates")?;
        index.insert(key.as_str(), id)?;
        drop(index);

        let mut stored = rate.clone();
        stored.id = id;
        write_entity(txn, RATES, id, &stored)?;
        Ok(id)
    }

    fn get_rate(&mut self, id: u64) -> StorageResult<Rate> {
        read_entity(self.txn()?, RATES, id)?.ok_or_else(|| StorageError::not_found("rate", id))
    }

    fn delete_rate(&mut self, id: u64) -> StorageResult<()> {
        let txn = self.txn()?;
        let rate: Rate =
            read_entity(txn, RATES, id)?.ok_or_else(|| StorageError::not_found("rate", id))?;

        remove_entity(txn, RATES, id)?;
        let mut index = txn.open_table(RATE_INDEX)?;
        index.remove(rate_key(&rate.evaluator, rate.project).as_str())?;
        Ok(())
    }

    fn evaluator_rates(&mut self, evaluator: &WalletAddress) -> StorageResult<Vec<Rate>> {
        let rates: Vec<Rate> = list_entities(self.txn()?, RATES)?;
        Ok(rates.into_iter().filter(|r| &r.evaluator == evaluator).collect())
    }

    fn evaluated_rates(&mut self, evaluated: &WalletAddress) -> StorageResult<Vec<Rate>> {
        let rates: Vec<Rate> = list_entities(self.txn()?, RATES)?;
        Ok(rates.into_iter().filter(|r| &r.evaluated == evaluated).collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
