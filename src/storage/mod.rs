// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Transactional persistence of users, projects, bids and rates.
//!
//! ## Transaction Model
//!
//! Every access goes through an explicit transaction object:
//!
//! ```text
//! let mut tx = storage.begin_tx()?;
//! let project = tx.get_project(id)?;
//! tx.update_project(&project)?;
//! tx.commit()?;
//! ```
//!
//! - [`Storage::begin_tx`] hands out a [`Transaction`]; there is no shared
//!   "current transaction" on the storage handle
//! - Dropping an unfinished transaction rolls it back
//! - [`StorageExt::with_tx`] runs a closure in an auto-committed transaction
//!   for callers that do not manage one themselves
//!
//! ## Backends
//!
//! - [`MemoryStorage`]: value collections behind one mutex, snapshot rollback
//! - [`DatabaseStorage`]: redb embedded database (pure Rust, ACID)
//!
//! Both enforce the same referential rules: references must point at
//! existing entities, and entities that are still referenced cannot be
//! deleted.

pub mod database;
pub mod memory;

use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};

use crate::models::{Bid, Project, Rate, User, WalletAddress};

pub use database::DatabaseStorage;
pub use memory::MemoryStorage;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("transaction already open on this thread")]
    TransactionAlreadyOpen,

    #[error("no open transaction")]
    NoOpenTransaction,

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StorageError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(entity: &'static str, id: impl ToString) -> Self {
        StorageError::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Contract
// =============================================================================

/// CRUD and listing operations available inside a transaction.
///
/// Ids of projects, bids and rates are assigned by storage on create; the
/// `id` field of the passed entity is ignored.
pub trait Repository {
    fn create_user(&mut self, user: &User) -> StorageResult<()>;
    fn get_user(&mut self, id: &WalletAddress) -> StorageResult<User>;
    fn update_user(&mut self, user: &User) -> StorageResult<()>;
    fn delete_user(&mut self, id: &WalletAddress) -> StorageResult<()>;
    fn list_users(&mut self) -> StorageResult<Vec<User>>;

    fn create_project(&mut self, project: &Project) -> StorageResult<u64>;
    fn get_project(&mut self, id: u64) -> StorageResult<Project>;
    fn update_project(&mut self, project: &Project) -> StorageResult<()>;
    fn delete_project(&mut self, id: u64) -> StorageResult<()>;
    fn list_projects(&mut self) -> StorageResult<Vec<Project>>;
    /// Projects owned by `owner`.
    fn user_projects(&mut self, owner: &WalletAddress) -> StorageResult<Vec<Project>>;

    fn create_bid(&mut self, bid: &Bid) -> StorageResult<u64>;
    fn get_bid(&mut self, id: u64) -> StorageResult<Bid>;
    fn update_bid(&mut self, bid: &Bid) -> StorageResult<()>;
    fn delete_bid(&mut self, id: u64) -> StorageResult<()>;
    fn project_bids(&mut self, project: u64) -> StorageResult<Vec<Bid>>;

    fn create_rate(&mut self, rate: &Rate) -> StorageResult<u64>;
    fn get_rate(&mut self, id: u64) -> StorageResult<Rate>;
    fn delete_rate(&mut self, id: u64) -> StorageResult<()>;
    fn evaluator_rates(&mut self, evaluator: &WalletAddress) -> StorageResult<Vec<Rate>>;
    fn evaluated_rates(&mut self, evaluated: &WalletAddress) -> StorageResult<Vec<Rate>>;
}

/// A unit of work against a storage backend.
///
/// After `commit` or `rollback` the transaction is finished: further calls,
/// including a second `commit`, fail with [`StorageError::NoOpenTransaction`].
pub trait Transaction: Repository {
    fn commit(&mut self) -> StorageResult<()>;
    fn rollback(&mut self) -> StorageResult<()>;
}

/// A storage backend shared across request handlers.
pub trait Storage: Send + Sync {
    /// Open a transaction.
    ///
    /// Fails with [`StorageError::TransactionAlreadyOpen`] if the calling
    /// thread already holds an open transaction on this storage. Other
    /// threads wait until the current transaction finishes.
    fn begin_tx(&self) -> StorageResult<Box<dyn Transaction + '_>>;
}

pub trait StorageExt: Storage {
    /// Run `f` inside a fresh transaction, committing on success.
    ///
    /// On error the transaction is dropped and thereby rolled back.
    fn with_tx<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut dyn Transaction) -> StorageResult<T>,
    {
        let mut tx = self.begin_tx()?;
        let value = f(tx.as_mut())?;
        tx.commit()?;
        Ok(value)
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

// =============================================================================
// Transaction Gate
// =============================================================================

/// Tracks which thread holds the open transaction of a backend.
///
/// The backend lock itself serializes threads; the gate only turns a nested
/// `begin_tx` on the holding thread into an error instead of a deadlock.
#[derive(Debug, Default)]
pub(crate) struct TxGate {
    holder: Mutex<Option<ThreadId>>,
}

impl TxGate {
    pub(crate) fn check_reentry(&self) -> StorageResult<()> {
        let holder = self.holder.lock().unwrap_or_else(PoisonError::into_inner);
        if *holder == Some(thread::current().id()) {
            return Err(StorageError::TransactionAlreadyOpen);
        }
        Ok(())
    }

    pub(crate) fn enter(&self) {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());
    }

    pub(crate) fn leave(&self) {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Key of the (evaluator, project) uniqueness index for rates.
pub(crate) fn rate_key(evaluator: &WalletAddress, project: u64) -> String {
    format!("{evaluator}|{project}")
}

// =============================================================================
// Backend Contract Tests
// =============================================================================

/// Checks shared by both backends. Each backend's test module calls these
/// with a fresh, empty storage.
#[cfg(test)]
pub(crate) mod contract {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::models::ProjectStatus;

    pub fn user(id: &str) -> User {
        User::new(id, id)
    }

    pub fn project(owner: &str) -> Project {
        Project {
            id: 0,
            title: "Build a bridge".into(),
            description: "Over the river".into(),
            tags: vec!["rust".into(), "bridge".into()],
            created: Utc::now(),
            status: ProjectStatus::Open,
            owner: owner.into(),
            contractor: None,
            started: None,
            deadline: Duration::from_secs(86_400),
            price: 1_000,
        }
    }

    pub fn bid(project: u64, user: &str) -> Bid {
        Bid {
            id: 0,
            project,
            user: user.into(),
            price: 900,
            deadline: Duration::from_secs(3_600),
            message: "pick me".into(),
        }
    }

    pub fn rate(project: u64, evaluator: &str, evaluated: &str) -> Rate {
        Rate {
            id: 0,
            project,
            evaluator: evaluator.into(),
            evaluated: evaluated.into(),
            value: 5,
            message: "great".into(),
        }
    }

    fn seed(storage: &dyn Storage) -> (u64, u64) {
        storage
            .with_tx(|tx| {
                tx.create_user(&user("owner"))?;
                tx.create_user(&user("contractor"))?;
                let project_id = tx.create_project(&project("owner"))?;
                let bid_id = tx.create_bid(&bid(project_id, "contractor"))?;
                Ok((project_id, bid_id))
            })
            .unwrap()
    }

    pub fn crud_round_trip(storage: &dyn Storage) {
        let (project_id, bid_id) = seed(storage);

        let mut tx = storage.begin_tx().unwrap();
        let owner = tx.get_user(&"owner".into()).unwrap();
        assert_eq!(owner.nickname, "owner");
        assert_eq!(tx.list_users().unwrap().len(), 2);

        let stored = tx.get_project(project_id).unwrap();
        assert_eq!(stored.id, project_id);
        assert_eq!(stored.tags, vec!["rust".to_string(), "bridge".to_string()]);
        assert_eq!(stored.deadline, Duration::from_secs(86_400));

        let stored_bid = tx.get_bid(bid_id).unwrap();
        assert_eq!(stored_bid.project, project_id);
        assert_eq!(tx.project_bids(project_id).unwrap(), vec![stored_bid]);
        assert_eq!(tx.user_projects(&"owner".into()).unwrap().len(), 1);
        assert!(tx.user_projects(&"contractor".into()).unwrap().is_empty());
        tx.commit().unwrap();
    }

    pub fn ids_start_at_one_and_increase(storage: &dyn Storage) {
        let ids = storage
            .with_tx(|tx| {
                tx.create_user(&user("owner"))?;
                let first = tx.create_project(&project("owner"))?;
                let second = tx.create_project(&project("owner"))?;
                tx.delete_project(second)?;
                let third = tx.create_project(&project("owner"))?;
                Ok((first, second, third))
            })
            .unwrap();

        assert_eq!(ids, (1, 2, 3));
    }

    pub fn update_writes_back(storage: &dyn Storage) {
        let (project_id, _) = seed(storage);

        storage
            .with_tx(|tx| {
                let mut project = tx.get_project(project_id)?;
                project.status = ProjectStatus::InWork;
                project.contractor = Some("contractor".into());
                tx.update_project(&project)?;

                let mut owner = tx.get_user(&"owner".into())?;
                owner.nonce = 42;
                tx.update_user(&owner)
            })
            .unwrap();

        let mut tx = storage.begin_tx().unwrap();
        let project = tx.get_project(project_id).unwrap();
        assert_eq!(project.status, ProjectStatus::InWork);
        assert_eq!(project.contractor, Some("contractor".into()));
        assert_eq!(tx.get_user(&"owner".into()).unwrap().nonce, 42);
    }

    pub fn rollback_discards_writes(storage: &dyn Storage) {
        let (project_id, _) = seed(storage);

        let mut tx = storage.begin_tx().unwrap();
        tx.create_user(&user("ghost")).unwrap();
        let mut project = tx.get_project(project_id).unwrap();
        project.title = "changed".into();
        tx.update_project(&project).unwrap();
        tx.rollback().unwrap();

        let mut tx = storage.begin_tx().unwrap();
        assert!(matches!(
            tx.get_user(&"ghost".into()),
            Err(StorageError::NotFound { .. })
        ));
        assert_eq!(tx.get_project(project_id).unwrap().title, "Build a bridge");
    }

    pub fn drop_rolls_back(storage: &dyn Storage) {
        {
            let mut tx = storage.begin_tx().unwrap();
            tx.create_user(&user("dropped")).unwrap();
        }

        let mut tx = storage.begin_tx().unwrap();
        assert!(tx.list_users().unwrap().is_empty());
    }

    pub fn finished_transaction_rejects_calls(storage: &dyn Storage) {
        let mut tx = storage.begin_tx().unwrap();
        tx.commit().unwrap();

        assert!(matches!(tx.commit(), Err(StorageError::NoOpenTransaction)));
        assert!(matches!(tx.rollback(), Err(StorageError::NoOpenTransaction)));
        assert!(matches!(tx.list_users(), Err(StorageError::NoOpenTransaction)));

        let mut tx = storage.begin_tx().unwrap();
        tx.rollback().unwrap();
        assert!(matches!(tx.rollback(), Err(StorageError::NoOpenTransaction)));
    }

    pub fn nested_begin_fails(storage: &dyn Storage) {
        let tx = storage.begin_tx().unwrap();
        assert!(matches!(
            storage.begin_tx(),
            Err(StorageError::TransactionAlreadyOpen)
        ));
        drop(tx);

        assert!(storage.begin_tx().is_ok());
    }

    pub fn missing_entities(storage: &dyn Storage) {
        let mut tx = storage.begin_tx().unwrap();
        assert!(matches!(
            tx.get_user(&"nobody".into()),
            Err(StorageError::NotFound { entity: "user", .. })
        ));
        assert!(matches!(
            tx.get_project(7),
            Err(StorageError::NotFound { entity: "project", .. })
        ));
        assert!(matches!(tx.get_bid(7), Err(StorageError::NotFound { .. })));
        assert!(matches!(tx.get_rate(7), Err(StorageError::NotFound { .. })));
        assert!(matches!(tx.delete_bid(7), Err(StorageError::NotFound { .. })));
        assert!(matches!(tx.delete_project(7), Err(StorageError::NotFound { .. })));
        assert!(matches!(
            tx.update_user(&user("nobody")),
            Err(StorageError::NotFound { .. })
        ));
        let mut missing = project("nobody");
        missing.id = 7;
        assert!(matches!(
            tx.update_project(&missing),
            Err(StorageError::NotFound { .. })
        ));
    }

    pub fn referential_rules(storage: &dyn Storage) {
        let (project_id, bid_id) = seed(storage);
        let mut tx = storage.begin_tx().unwrap();

        assert!(matches!(
            tx.create_user(&user("owner")),
            Err(StorageError::AlreadyExists { entity: "user", .. })
        ));
        assert!(matches!(
            tx.create_project(&project("nobody")),
            Err(StorageError::InvalidReference(_))
        ));
        assert!(matches!(
            tx.create_bid(&bid(999, "contractor")),
            Err(StorageError::InvalidReference(_))
        ));
        assert!(matches!(
            tx.create_bid(&bid(project_id, "nobody")),
            Err(StorageError::InvalidReference(_))
        ));

        let mut assigned = tx.get_project(project_id).unwrap();
        assigned.contractor = Some("nobody".into());
        assert!(matches!(
            tx.update_project(&assigned),
            Err(StorageError::InvalidReference(_))
        ));

        assert!(matches!(
            tx.delete_user(&"contractor".into()),
            Err(StorageError::InvalidReference(_))
        ));
        assert!(matches!(
            tx.delete_project(project_id),
            Err(StorageError::InvalidReference(_))
        ));

        tx.delete_bid(bid_id).unwrap();
        tx.delete_user(&"contractor".into()).unwrap();
        tx.delete_project(project_id).unwrap();
        tx.delete_user(&"owner".into()).unwrap();
        tx.commit().unwrap();
    }

    pub fn rates_are_unique_per_evaluator(storage: &dyn Storage) {
        let (project_id, bid_id) = seed(storage);
        let mut tx = storage.begin_tx().unwrap();

        let rate_id = tx.create_rate(&rate(project_id, "owner", "contractor")).unwrap();
        assert!(matches!(
            tx.create_rate(&rate(project_id, "owner", "contractor")),
            Err(StorageError::AlreadyExists { entity: "rate", .. })
        ));
        assert!(matches!(
            tx.create_rate(&rate(project_id, "owner", "nobody")),
            Err(StorageError::InvalidReference(_))
        ));
        tx.create_rate(&rate(project_id, "contractor", "owner")).unwrap();

        assert_eq!(tx.get_rate(rate_id).unwrap().value, 5);
        assert_eq!(tx.evaluator_rates(&"owner".into()).unwrap().len(), 1);
        assert_eq!(tx.evaluated_rates(&"owner".into()).unwrap().len(), 1);

        tx.delete_bid(bid_id).unwrap();
        assert!(matches!(
            tx.delete_project(project_id),
            Err(StorageError::InvalidReference(_))
        ));

        tx.delete_rate(rate_id).unwrap();
        tx.create_rate(&rate(project_id, "owner", "contractor")).unwrap();
        tx.commit().unwrap();
    }

    pub fn other_threads_wait(storage: std::sync::Arc<dyn Storage>) {
        storage.with_tx(|tx| tx.create_user(&user("owner"))).unwrap();

        let mut tx = storage.begin_tx().unwrap();
        let mut owner = tx.get_user(&"owner".into()).unwrap();
        owner.nonce = 1;
        tx.update_user(&owner).unwrap();

        let reader = {
            let storage = std::sync::Arc::clone(&storage);
            std::thread::spawn(move || {
                storage
                    .with_tx(|tx| tx.get_user(&"owner".into()))
                    .map(|user| user.nonce)
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        tx.commit().unwrap();
        drop(tx);

        assert_eq!(reader.join().unwrap().unwrap(), 1);
    }
}
