//! Chain client: the seam between ledger bookkeeping and "on-chain" confirmation.
//!
//! Nothing here talks to a real network. [`SimulatedChain`] waits a fixed
//! delay and invents a transaction hash, block number and gas figures;
//! [`ScriptedChain`] does the same deterministically and can be told to fail,
//! which is what the ledger tests run against.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::debug;

use crate::amount::Amount;
use crate::error::{LedgerError, Result};

/// Default confirmation delay of the simulated chain.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(2_000);

/// Gas price used to derive the synthetic fee, in gwei.
const GAS_PRICE_GWEI: i64 = 20;

const BLOCK_RANGE: std::ops::Range<u64> = 18_000_000..19_000_000;

/// A write the ledger wants confirmed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainCall {
    CreateRequest {
        creator: String,
    },
    Donate {
        donor: String,
        recipient: String,
        amount: Amount,
    },
}

impl ChainCall {
    /// Rough gas budget for the call, used to pick synthetic `gas_used` values.
    fn gas_range(&self) -> std::ops::RangeInclusive<u64> {
        match self {
            ChainCall::CreateRequest { .. } => 150_000..=250_000,
            ChainCall::Donate { .. } => 21_000..=65_000,
        }
    }
}

/// What a confirmed call hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
    /// `gas_used * gas price`, in ETH.
    pub gas_fee: Amount,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submit `call` and wait for it to be confirmed.
    async fn submit(&self, call: &ChainCall) -> Result<Receipt>;
}

/// Fee in ETH for `gas_used` at [`GAS_PRICE_GWEI`].
pub fn gas_fee(gas_used: u64) -> Amount {
    let gwei = Decimal::from(gas_used) * Decimal::from(GAS_PRICE_GWEI);
    // 1 gwei = 1e-9 ETH
    Amount::from_decimal((gwei / Decimal::from(1_000_000_000u64)).normalize())
}

/// `0x`-prefixed 32-byte hex string.
pub fn format_hash(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// ─────────────────────────────────────────────────────────
// Simulated backend
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimulatedChain {
    latency: Duration,
}

impl SimulatedChain {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    async fn submit(&self, call: &ChainCall) -> Result<Receipt> {
        tokio::time::sleep(self.latency).await;

        // ThreadRng is not Send; keep it out of any await.
        let receipt = {
            let mut rng = rand::thread_rng();
            let hash: [u8; 32] = rng.gen();
            let gas_used = rng.gen_range(call.gas_range());
            Receipt {
                tx_hash: format_hash(&hash),
                block_number: rng.gen_range(BLOCK_RANGE),
                gas_used,
                gas_fee: gas_fee(gas_used),
            }
        };

        debug!(
            "Simulated confirmation {} in block {}",
            receipt.tx_hash, receipt.block_number
        );
        Ok(receipt)
    }
}

// ─────────────────────────────────────────────────────────
// Deterministic backend
// ─────────────────────────────────────────────────────────

/// Deterministic chain: the n-th successful call gets hash `n` (as 32-byte
/// hex) and block `first_block + n`. Queued failures are returned, in order,
/// after the latency elapses.
#[derive(Debug)]
pub struct ScriptedChain {
    latency: Duration,
    first_block: u64,
    gas_used: u64,
    calls: AtomicU64,
    failures: Mutex<VecDeque<String>>,
    submitted: Mutex<Vec<ChainCall>>,
}

impl ScriptedChain {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            first_block: 1,
            gas_used: 21_000,
            calls: AtomicU64::new(0),
            failures: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Make the next submission fail with `message`.
    pub async fn fail_next(&self, message: impl Into<String>) {
        self.failures.lock().await.push_back(message.into());
    }

    /// Every call submitted so far, including failed ones.
    pub async fn submitted(&self) -> Vec<ChainCall> {
        self.submitted.lock().await.clone()
    }
}

impl Default for ScriptedChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn submit(&self, call: &ChainCall) -> Result<Receipt> {
        self.submitted.lock().await.push(call.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(message) = self.failures.lock().await.pop_front() {
            return Err(LedgerError::Chain(message));
        }

        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut hash = [0u8; 32];
        hash[24..].copy_from_slice(&n.to_be_bytes());
        Ok(Receipt {
            tx_hash: format_hash(&hash),
            block_number: self.first_block + n,
            gas_used: self.gas_used,
            gas_fee: gas_fee(self.gas_used),
        })
    }
}
