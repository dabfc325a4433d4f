//! Append-only transaction log the ledger writes into for audit display.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::types::{LoggedTransaction, TransactionRecord};

#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn append(&self, record: TransactionRecord);
}

/// Keeps every entry in memory, newest last.
#[derive(Debug, Default)]
pub struct MemoryTransactionLog {
    entries: RwLock<Vec<LoggedTransaction>>,
}

impl MemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<LoggedTransaction> {
        self.entries.read().await.clone()
    }

    /// Entries sent from or to `address`, compared case-insensitively.
    pub async fn entries_for(&self, address: &str) -> Vec<LoggedTransaction> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|tx| {
                crate::same_address(&tx.record.from, address)
                    || tx
                        .record
                        .to
                        .as_deref()
                        .is_some_and(|to| crate::same_address(to, address))
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TransactionLog for MemoryTransactionLog {
    async fn append(&self, record: TransactionRecord) {
        let mut entries = self.entries.write().await;
        let id = entries.len() as u64 + 1;
        entries.push(LoggedTransaction {
            id,
            timestamp: Utc::now(),
            record,
        });
    }
}
