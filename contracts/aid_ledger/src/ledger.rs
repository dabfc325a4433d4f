//! # Ledger
//!
//! [`AidLedger`] owns the aid-request and donation lists. It is the only
//! writer of either list and the only code that persists them.
//!
//! ## Write path
//!
//! ```text
//! wallet check ─► request lookup ─► chain.submit (latency) ─► build records
//!      ─► persist full list(s) ─► swap in memory ─► transaction log
//! ```
//!
//! Nothing is appended until the chain call has succeeded and the new lists
//! have been persisted, so a failed write leaves no trace in either list.
//!
//! ## Overlapping donations
//!
//! The state lock is never held across `chain.submit`. A donation reads the
//! target request before the call and writes `snapshot + amount` after it, so
//! two donations to the same request that overlap both start from the same
//! snapshot and the later write wins. The donation list still records both.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::amount::Amount;
use crate::chain::{ChainCall, ChainClient};
use crate::error::{LedgerError, Result};
use crate::seed::seed_requests;
use crate::storage::{load_list, save_list, Storage, DONATIONS_KEY, REQUESTS_KEY};
use crate::tx_log::TransactionLog;
use crate::types::{
    AidRequest, Donation, LedgerStats, NewAidRequest, RequestStatus, TransactionKind,
    TransactionRecord, TransactionStatus,
};
use crate::wallet::Wallet;

/// Compare two wallet addresses the way every query does: case-insensitively.
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Everything the ledger talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub chain: Arc<dyn ChainClient>,
    pub wallet: Arc<dyn Wallet>,
    pub tx_log: Arc<dyn TransactionLog>,
}

#[derive(Debug, Clone)]
pub struct LedgerOptions {
    /// Write the example requests when storage has none.
    pub seed_when_empty: bool,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            seed_when_empty: true,
        }
    }
}

struct LedgerState {
    requests: Vec<AidRequest>,
    donations: Vec<Donation>,
    last_id: u64,
}

impl LedgerState {
    /// Millisecond timestamp, bumped past the last handed-out id when the
    /// clock has not moved (or moved backwards).
    fn next_id(&mut self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.last_id = now.max(self.last_id.saturating_add(1));
        self.last_id.to_string()
    }
}

/// Clears the busy flag when the write finishes, on every path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct AidLedger {
    storage: Arc<dyn Storage>,
    chain: Arc<dyn ChainClient>,
    wallet: Arc<dyn Wallet>,
    tx_log: Arc<dyn TransactionLog>,
    state: RwLock<LedgerState>,
    busy: AtomicBool,
    last_error: watch::Sender<Option<String>>,
    revision: watch::Sender<u64>,
}

impl AidLedger {
    /// Load persisted requests and donations, seeding example requests when
    /// storage has never held any.
    pub async fn load(deps: Collaborators, options: LedgerOptions) -> Result<Self> {
        let requests = match load_list::<AidRequest>(deps.storage.as_ref(), REQUESTS_KEY).await? {
            Some(requests) => {
                info!("Loaded {} aid requests", requests.len());
                requests
            }
            None if options.seed_when_empty => {
                let seed = seed_requests()?;
                save_list(deps.storage.as_ref(), REQUESTS_KEY, &seed).await?;
                info!("Seeded {} example aid requests", seed.len());
                seed
            }
            None => Vec::new(),
        };

        let donations = load_list::<Donation>(deps.storage.as_ref(), DONATIONS_KEY)
            .await?
            .unwrap_or_default();
        debug!("Loaded {} donations", donations.len());

        let last_id = requests
            .iter()
            .map(|r| r.id.as_str())
            .chain(donations.iter().map(|d| d.id.as_str()))
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        let (last_error, _) = watch::channel(None);
        let (revision, _) = watch::channel(0);

        Ok(AidLedger {
            storage: deps.storage,
            chain: deps.chain,
            wallet: deps.wallet,
            tx_log: deps.tx_log,
            state: RwLock::new(LedgerState {
                requests,
                donations,
                last_id,
            }),
            busy: AtomicBool::new(false),
            last_error,
            revision,
        })
    }

    // ─────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────

    /// Open a new aid request on behalf of the connected wallet.
    ///
    /// Returns the new request's id.
    pub async fn create_request(&self, data: NewAidRequest) -> Result<String> {
        let _busy = self.begin_write();
        let result = self.run_create(data).await;
        self.finish_write("create_request", &result);
        result
    }

    /// Donate `amount` (a decimal ETH string) to `request_id`.
    ///
    /// Returns the donation's transaction hash.
    pub async fn donate_to_request(&self, request_id: &str, amount: &str) -> Result<String> {
        let _busy = self.begin_write();
        let result = self.run_donate(request_id, amount).await;
        self.finish_write("donate_to_request", &result);
        result
    }

    async fn run_create(&self, data: NewAidRequest) -> Result<String> {
        let wallet = self.wallet.snapshot();
        let creator = wallet
            .connected_address()
            .ok_or(LedgerError::NotConnected)?
            .to_string();

        let receipt = self
            .chain
            .submit(&ChainCall::CreateRequest {
                creator: creator.clone(),
            })
            .await?;

        let mut state = self.state.write().await;
        let id = state.next_id();
        let request = AidRequest::open(id.clone(), data, creator.clone(), Utc::now().date_naive());
        let description = format!("Created aid request: {}", request.title);

        let mut requests = state.requests.clone();
        requests.push(request);
        save_list(self.storage.as_ref(), REQUESTS_KEY, &requests).await?;
        state.requests = requests;
        drop(state);
        self.bump_revision();

        self.tx_log
            .append(TransactionRecord {
                kind: TransactionKind::RequestCreation,
                from: creator.clone(),
                to: None,
                amount: None,
                description,
                status: TransactionStatus::Confirmed,
                hash: receipt.tx_hash,
                gas_used: receipt.gas_used,
                gas_fee: receipt.gas_fee,
                block_number: receipt.block_number,
                request_id: id.clone(),
            })
            .await;

        info!("Aid request {id} created by {creator}");
        Ok(id)
    }

    async fn run_donate(&self, request_id: &str, amount: &str) -> Result<String> {
        let wallet = self.wallet.snapshot();
        let donor = match (wallet.connected_address(), wallet.signer.as_ref()) {
            (Some(address), Some(_signer)) => address.to_string(),
            _ => return Err(LedgerError::NotConnected),
        };

        let snapshot = self
            .get_request_by_id(request_id)
            .await
            .ok_or_else(|| LedgerError::RequestNotFound(request_id.to_string()))?;
        let amount = Amount::parse_positive(amount)?;
        let updated = snapshot.with_donation(&amount)?;

        let receipt = self
            .chain
            .submit(&ChainCall::Donate {
                donor: donor.clone(),
                recipient: snapshot.creator.clone(),
                amount,
            })
            .await?;

        let mut state = self.state.write().await;
        let donation = Donation {
            id: state.next_id(),
            request_id: request_id.to_string(),
            donor: donor.clone(),
            amount,
            timestamp: Utc::now(),
            transaction_hash: receipt.tx_hash.clone(),
        };

        let mut donations = state.donations.clone();
        donations.push(donation);
        let mut requests = state.requests.clone();
        if let Some(slot) = requests.iter_mut().find(|r| r.id == updated.id) {
            *slot = updated.clone();
        }

        save_list(self.storage.as_ref(), DONATIONS_KEY, &donations).await?;
        if let Err(e) = save_list(self.storage.as_ref(), REQUESTS_KEY, &requests).await {
            // Put the stored donations back in step with the stored requests.
            if let Err(rollback) =
                save_list(self.storage.as_ref(), DONATIONS_KEY, &state.donations).await
            {
                warn!("Could not restore persisted donations: {rollback}");
            }
            return Err(e);
        }
        state.donations = donations;
        state.requests = requests;
        drop(state);
        self.bump_revision();

        if updated.status == RequestStatus::Completed
            && snapshot.status != RequestStatus::Completed
        {
            info!("Aid request {request_id} reached its target of {}", updated.target);
        }

        self.tx_log
            .append(TransactionRecord {
                kind: TransactionKind::Donation,
                from: donor.clone(),
                to: Some(snapshot.creator.clone()),
                amount: Some(amount),
                description: format!("Donated {amount} ETH to {}", snapshot.title),
                status: TransactionStatus::Confirmed,
                hash: receipt.tx_hash.clone(),
                gas_used: receipt.gas_used,
                gas_fee: receipt.gas_fee,
                block_number: receipt.block_number,
                request_id: request_id.to_string(),
            })
            .await;

        info!(
            "Donation of {amount} ETH from {donor} to request {request_id} (raised {} / {})",
            updated.raised, updated.target
        );
        Ok(receipt.tx_hash)
    }

    fn begin_write(&self) -> BusyGuard<'_> {
        self.busy.store(true, Ordering::SeqCst);
        self.last_error.send_replace(None);
        BusyGuard(&self.busy)
    }

    fn finish_write<T>(&self, operation: &str, result: &Result<T>) {
        if let Err(e) = result {
            warn!("{operation} failed: {e}");
            self.last_error.send_replace(Some(e.to_string()));
        }
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub async fn get_request_by_id(&self, id: &str) -> Option<AidRequest> {
        self.state
            .read()
            .await
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Requests opened by `address` (case-insensitive), in creation order.
    pub async fn get_user_requests(&self, address: &str) -> Vec<AidRequest> {
        self.state
            .read()
            .await
            .requests
            .iter()
            .filter(|r| same_address(&r.creator, address))
            .cloned()
            .collect()
    }

    /// Donations made by `address` (case-insensitive), oldest first.
    pub async fn get_user_donations(&self, address: &str) -> Vec<Donation> {
        self.state
            .read()
            .await
            .donations
            .iter()
            .filter(|d| same_address(&d.donor, address))
            .cloned()
            .collect()
    }

    pub async fn get_request_donations(&self, request_id: &str) -> Vec<Donation> {
        self.state
            .read()
            .await
            .donations
            .iter()
            .filter(|d| d.request_id == request_id)
            .cloned()
            .collect()
    }

    pub async fn requests(&self) -> Vec<AidRequest> {
        self.state.read().await.requests.clone()
    }

    pub async fn donations(&self) -> Vec<Donation> {
        self.state.read().await.donations.clone()
    }

    /// Fails only when the summed `raised` values overflow.
    pub async fn stats(&self) -> Result<LedgerStats> {
        let state = self.state.read().await;
        let count = |status: RequestStatus| {
            state
                .requests
                .iter()
                .filter(|r| r.status == status)
                .count()
        };
        let total_raised = state
            .requests
            .iter()
            .try_fold(Amount::zero(), |acc, r| acc.accumulate(&r.raised))?;
        Ok(LedgerStats {
            requests: state.requests.len(),
            active: count(RequestStatus::Active),
            completed: count(RequestStatus::Completed),
            donations: state.donations.len(),
            total_raised,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Message of the most recent failed write, cleared when the next write starts.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    /// Number of committed writes since load.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Watch the revision counter, bumped after every committed write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
