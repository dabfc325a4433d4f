//! Wallet state, as seen by the ledger: read-only.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::amount::Amount;

/// Capability to sign transactions. Only exists while a wallet is connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    address: String,
}

impl Signer {
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub is_connected: bool,
    pub address: Option<String>,
    #[serde(skip)]
    pub signer: Option<Signer>,
    pub balance: Amount,
}

impl WalletSnapshot {
    pub fn disconnected() -> Self {
        WalletSnapshot {
            is_connected: false,
            address: None,
            signer: None,
            balance: Amount::zero(),
        }
    }

    /// Address of a connected wallet, if there is one.
    pub fn connected_address(&self) -> Option<&str> {
        if self.is_connected {
            self.address.as_deref()
        } else {
            None
        }
    }
}

pub trait Wallet: Send + Sync {
    fn snapshot(&self) -> WalletSnapshot;
}

/// A single user's wallet connection.
#[derive(Debug)]
pub struct WalletSession {
    state: watch::Sender<WalletSnapshot>,
}

impl WalletSession {
    pub fn new() -> Self {
        let (state, _) = watch::channel(WalletSnapshot::disconnected());
        Self { state }
    }

    /// Connect `address`, replacing any previous connection.
    pub fn connect(&self, address: impl Into<String>, balance: Amount) -> WalletSnapshot {
        let address = address.into();
        info!("Wallet connected: {address}");
        let snapshot = WalletSnapshot {
            is_connected: true,
            signer: Some(Signer {
                address: address.clone(),
            }),
            address: Some(address),
            balance,
        };
        self.state.send_replace(snapshot.clone());
        snapshot
    }

    pub fn disconnect(&self) {
        let previous = self.state.send_replace(WalletSnapshot::disconnected());
        if let Some(address) = previous.address {
            info!("Wallet disconnected: {address}");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletSnapshot> {
        self.state.subscribe()
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet for WalletSession {
    fn snapshot(&self) -> WalletSnapshot {
        self.state.borrow().clone()
    }
}
