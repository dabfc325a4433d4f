//! # Types
//!
//! Shared data structures used across the aid ledger.
//!
//! ## Design decisions
//!
//! ### Caller input vs stored record
//!
//! [`NewAidRequest`] is what a caller supplies when opening a campaign. The
//! ledger derives the remaining [`AidRequest`] fields (`id`, `raised`,
//! `contributors`, `created_at`, `creator`, `status`) itself, so callers can
//! never forge them.
//!
//! ### Status as a one-way switch
//!
//! ```text
//! Active ──► Completed        (raised >= target, applied on donation)
//! Cancelled                    (representable, never produced)
//! ```
//!
//! ### Wire shape
//!
//! Every record serialises with camelCase keys and string amounts so the
//! persisted `aidRequests` / `donations` arrays keep their historical layout.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::Result;

/// Lifecycle status of an aid request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Accepting donations.
    Active,
    /// Raised amount reached the target.
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Caller-supplied fields for a new aid request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAidRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub target: Amount,
    pub days_left: u32,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub verified: bool,
}

/// A funding campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AidRequest {
    /// Unique, immutable identifier.
    pub id: String,
    pub title: String,
    pub description: String,
    /// Free-form category tag (`medical`, `education`, `disaster`, ...).
    pub category: String,
    pub location: String,
    /// Funding goal in ETH.
    pub target: Amount,
    /// Sum of all donations; never decreases.
    pub raised: Amount,
    /// Number of successful donations.
    pub contributors: u32,
    pub days_left: u32,
    pub urgent: bool,
    pub verified: bool,
    /// Calendar date the request was opened.
    pub created_at: NaiveDate,
    /// Address of the wallet that opened the request.
    pub creator: String,
    pub status: RequestStatus,
}

impl AidRequest {
    /// Build a fresh, active request from caller input.
    pub fn open(id: String, data: NewAidRequest, creator: String, created_at: NaiveDate) -> Self {
        AidRequest {
            id,
            title: data.title,
            description: data.description,
            category: data.category,
            location: data.location,
            target: data.target,
            raised: Amount::zero(),
            contributors: 0,
            days_left: data.days_left,
            urgent: data.urgent,
            verified: data.verified,
            created_at,
            creator,
            status: RequestStatus::Active,
        }
    }

    /// Return a copy with one more donation of `amount` applied.
    ///
    /// Only `raised`, `contributors` and `status` change. The status flips to
    /// `Completed` once `raised >= target` and is otherwise left alone, so a
    /// completed request stays completed.
    pub fn with_donation(&self, amount: &Amount) -> Result<Self> {
        let raised = self.raised.accumulate(amount)?;
        let status = if raised >= self.target {
            RequestStatus::Completed
        } else {
            self.status
        };
        Ok(AidRequest {
            raised,
            contributors: self.contributors.saturating_add(1),
            status,
            ..self.clone()
        })
    }
}

/// A single contribution event. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: String,
    pub request_id: String,
    pub donor: String,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
    /// Hash returned by the chain client for this donation.
    pub transaction_hash: String,
}

/// Kind of entry appended to the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    RequestCreation,
    Donation,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestCreation => "request_creation",
            Self::Donation => "donation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

/// A record handed to the transaction log by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    pub description: String,
    pub status: TransactionStatus,
    pub hash: String,
    pub gas_used: u64,
    pub gas_fee: Amount,
    pub block_number: u64,
    pub request_id: String,
}

/// A transaction-log entry as stored by a [`TransactionLog`](crate::TransactionLog).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedTransaction {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub record: TransactionRecord,
}

/// Aggregate view over the ledger's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub requests: usize,
    pub active: usize,
    pub completed: usize,
    pub donations: usize,
    pub total_raised: Amount,
}
