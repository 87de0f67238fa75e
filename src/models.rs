// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Marketplace Data Models
//!
//! Entities persisted by the storage layer and exchanged over the REST API.
//! All types derive `Serialize`, `Deserialize`, and `ToSchema` for JSON
//! handling and OpenAPI documentation.
//!
//! ## Wallet Address Type
//!
//! The [`WalletAddress`] newtype is the identity of a user. Derived addresses
//! are `0x` followed by 40 hex characters, but storage treats the value as an
//! opaque key.
//!
//! ## References
//!
//! Entities refer to each other by identifier only (`Project::owner`,
//! `Bid::project`, ...). Resolving a reference always goes through storage.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Ethereum-compatible wallet address wrapper.
///
/// Format of derived addresses: `0x` followed by 40 hexadecimal characters.
///
/// # Example
///
/// ```rust,ignore
/// let addr = WalletAddress::from("0x742d35cc6634c0532925a3b844bc9e7595f4ab12");
/// ```
#[derive(
    Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        WalletAddress(value)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

// =============================================================================
// Users
// =============================================================================

/// A registered marketplace participant.
///
/// `id` is the verified wallet address of the registering caller and never
/// changes. `nonce` only ever grows; it is advanced by every authenticated
/// request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct User {
    pub id: WalletAddress,
    pub nickname: String,
    pub description: String,
    pub nonce: u64,
    pub registered: DateTime<Utc>,
    pub status: u8,
    pub tags: Vec<String>,
    pub rating: f64,
    pub account: u64,
}

impl User {
    /// A fresh user record with zeroed counters.
    pub fn new(id: impl Into<WalletAddress>, nickname: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nickname: nickname.into(),
            description: String::new(),
            nonce: 0,
            registered: Utc::now(),
            status: 0,
            tags: Vec::new(),
            rating: 0.0,
            account: 0,
        }
    }
}

// =============================================================================
// Projects
// =============================================================================

/// Lifecycle state of a project.
///
/// `Open` is initial; `Completed` and `Canceled` are terminal. Transitions
/// are defined in [`crate::service::lifecycle`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Open,
    InWork,
    InReview,
    Completed,
    Canceled,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProjectStatus::Open => "open",
            ProjectStatus::InWork => "in_work",
            ProjectStatus::InReview => "in_review",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// A unit of work posted by its owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Project {
    /// Storage-assigned identifier (starts at 1, never reused).
    pub id: u64,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    pub status: ProjectStatus,
    pub owner: WalletAddress,
    /// Set when a bid is accepted.
    pub contractor: Option<WalletAddress>,
    /// Set when a bid is accepted.
    pub started: Option<DateTime<Utc>>,
    /// Time allowed for the work, in whole seconds on the wire.
    #[serde(with = "duration_secs")]
    #[schema(value_type = u64)]
    pub deadline: Duration,
    pub price: u64,
}

/// Fields supplied when posting a project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Declared owner; the API fills in the verified caller when omitted.
    #[serde(default)]
    pub owner: Option<WalletAddress>,
    #[serde(with = "duration_secs")]
    #[schema(value_type = u64)]
    pub deadline: Duration,
    pub price: u64,
}

/// Editable fields of an open project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(with = "duration_secs")]
    #[schema(value_type = u64)]
    pub deadline: Duration,
    pub price: u64,
}

// =============================================================================
// Bids
// =============================================================================

/// An offer from a prospective contractor to execute an open project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Bid {
    pub id: u64,
    pub project: u64,
    /// The bidder.
    pub user: WalletAddress,
    pub price: u64,
    #[serde(with = "duration_secs")]
    #[schema(value_type = u64)]
    pub deadline: Duration,
    pub message: String,
}

/// Fields supplied when placing a bid.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct NewBid {
    /// Declared bidder; the API fills in the verified caller when omitted.
    #[serde(default)]
    pub user: Option<WalletAddress>,
    pub price: u64,
    #[serde(with = "duration_secs")]
    #[schema(value_type = u64)]
    pub deadline: Duration,
    #[serde(default)]
    pub message: String,
}

/// Revised terms of an existing bid.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BidTerms {
    pub price: u64,
    #[serde(with = "duration_secs")]
    #[schema(value_type = u64)]
    pub deadline: Duration,
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// Rates
// =============================================================================

/// Feedback one party of a finished project leaves about the other.
///
/// At most one rate exists per `(evaluator, project)`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Rate {
    pub id: u64,
    pub project: u64,
    pub evaluator: WalletAddress,
    pub evaluated: WalletAddress,
    pub value: u8,
    pub message: String,
}

/// Rating submitted for a finished project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RateRequest {
    pub value: u8,
    #[serde(default)]
    pub message: String,
}

/// Rates given and received by a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserRates {
    pub given: Vec<Rate>,
    pub received: Vec<Rate>,
}

// =============================================================================
// Registration
// =============================================================================

/// Profile supplied at registration. The id is always the verified caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RegisterRequest {
    pub nickname: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Serializes a [`Duration`] as whole seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
