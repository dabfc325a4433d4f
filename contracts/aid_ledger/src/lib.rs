//! # Aid Ledger
//!
//! Bookkeeping for a donation marketplace: users open **aid requests**,
//! connect a wallet, and donate to existing requests. Chain interaction is
//! simulated; requests and donations live in a key-value store.
//!
//! | Phase        | Entry Point(s)                                              |
//! |--------------|-------------------------------------------------------------|
//! | Bootstrap    | [`AidLedger::load`]                                         |
//! | Registration | [`AidLedger::create_request`]                               |
//! | Funding      | [`AidLedger::donate_to_request`]                            |
//! | Queries      | `get_request_by_id`, `get_user_requests`, `get_user_donations` |
//! | Observation  | `requests`, `donations`, `is_busy`, `last_error`, `subscribe` |
//!
//! ## Architecture
//!
//! The ledger depends on four collaborators, each behind a trait so callers
//! and tests can swap implementations:
//!
//! - [`Storage`]: load/save JSON lists by key ([`MemoryStorage`], [`FileStorage`]).
//! - [`ChainClient`]: confirms writes ([`SimulatedChain`], [`ScriptedChain`]).
//! - [`Wallet`]: read-only connection state ([`WalletSession`]).
//! - [`TransactionLog`]: write-only audit trail ([`MemoryTransactionLog`]).

pub mod amount;
pub mod chain;
mod error;
mod ledger;
mod seed;
pub mod storage;
pub mod tx_log;
mod types;
pub mod wallet;

#[cfg(test)]
mod test_donations;

pub use amount::Amount;
pub use chain::{ChainCall, ChainClient, Receipt, ScriptedChain, SimulatedChain};
pub use error::{LedgerError, Result};
pub use ledger::{same_address, AidLedger, Collaborators, LedgerOptions};
pub use seed::seed_requests;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use tx_log::{MemoryTransactionLog, TransactionLog};
pub use types::{
    AidRequest, Donation, LedgerStats, LoggedTransaction, NewAidRequest, RequestStatus,
    TransactionKind, TransactionRecord, TransactionStatus,
};
pub use wallet::{Signer, Wallet, WalletSession, WalletSnapshot};
