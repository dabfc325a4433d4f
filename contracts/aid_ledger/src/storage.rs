//! # Storage
//!
//! Key-value persistence behind the [`Storage`] trait. The ledger owns two keys:
//!
//! | Key           | Value                          |
//! |---------------|--------------------------------|
//! | `aidRequests` | JSON array of `AidRequest`     |
//! | `donations`   | JSON array of `Donation`       |
//!
//! Both are read once when the ledger loads and rewritten in full on every
//! mutation. There is no delta persistence and no schema version.
//!
//! Two backends live here: [`MemoryStorage`] for tests and embedding, and
//! [`FileStorage`], which keeps one `<key>.json` file per key in a directory.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

pub const REQUESTS_KEY: &str = "aidRequests";
pub const DONATIONS_KEY: &str = "donations";

#[async_trait]
pub trait Storage: Send + Sync {
    /// Return the raw value stored under `key`, or `None` if nothing was saved.
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    async fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// Load and decode a JSON list. `None` when the key has never been written.
pub async fn load_list<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<Vec<T>>> {
    match storage.load(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a whole list under `key`.
pub async fn save_list<T: Serialize>(storage: &dyn Storage, key: &str, items: &[T]) -> Result<()> {
    let raw = serde_json::to_string(items)?;
    storage.save(key, &raw).await?;
    debug!("Persisted {} records under {key}", items.len());
    Ok(())
}

// ─────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key, as if an earlier session had written it.
    pub async fn insert(&self, key: &str, value: impl Into<String>) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.into());
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// File backend
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Files are written lazily; the directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // Readers only ever see a complete list: write aside, then rename.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
