//! # Preference store
//!
//! Remembers, per foundation, the amount the user last chose. The whole
//! mapping is a JSON array of [`PreferenceRecord`] kept under one fixed
//! namespace of a [`KeyValueStore`]:
//!
//! ```text
//! foundationData → [{"id":"1","donationAmount":"20"},
//!                   {"id":"4","donationAmount":"custom","customAmount":75}]
//! ```
//!
//! Every write reads the mapping, changes one record and rewrites the
//! whole document with a single `set`. The read-modify-write runs under an
//! async mutex so concurrent upserts for different foundations never lose
//! each other's records.

use std::future::Future;

use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::debug;

use crate::db;
use crate::errors::Result;
use crate::types::PreferenceRecord;

/// Durable medium addressed by namespace.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, namespace: &str) -> impl Future<Output = Result<Option<String>>> + Send;
    fn set(&self, namespace: &str, value: String) -> impl Future<Output = Result<()>> + Send;
}

/// SQLite-backed medium; survives process restarts.
#[derive(Debug, Clone)]
pub struct SqliteKeyValue {
    pool: SqlitePool,
}

impl SqliteKeyValue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl KeyValueStore for SqliteKeyValue {
    async fn get(&self, namespace: &str) -> Result<Option<String>> {
        db::get_value(&self.pool, namespace).await
    }

    async fn set(&self, namespace: &str, value: String) -> Result<()> {
        db::put_value(&self.pool, namespace, &value).await
    }
}

/// Process-local medium, used in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryKeyValue {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryKeyValue {
    pub fn raw(&self, namespace: &str) -> Option<String> {
        self.entries.lock().ok()?.get(namespace).cloned()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryKeyValue {
    async fn get(&self, namespace: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .ok()
            .and_then(|map| map.get(namespace).cloned()))
    }

    async fn set(&self, namespace: &str, value: String) -> Result<()> {
        if let Ok(mut map) = self.entries.lock() {
            map.insert(namespace.to_string(), value);
        }
        Ok(())
    }
}

/// Per-foundation amount preferences over a [`KeyValueStore`].
#[derive(Debug)]
pub struct PreferenceStore<K> {
    medium: K,
    namespace: String,
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> PreferenceStore<K> {
    pub fn new(medium: K, namespace: impl Into<String>) -> Self {
        Self {
            medium,
            namespace: namespace.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn medium(&self) -> &K {
        &self.medium
    }

    /// Last saved preference for `foundation_id`, or `None` if the
    /// foundation has never been selected.
    pub async fn get(&self, foundation_id: &str) -> Result<Option<PreferenceRecord>> {
        let records = self.load().await?;
        Ok(records.into_iter().find(|r| r.id == foundation_id))
    }

    /// Insert or overwrite the record for `record.id`, keeping all others.
    pub async fn upsert(&self, record: PreferenceRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;

        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }

        let document = serde_json::to_string(&records)?;
        self.medium.set(&self.namespace, document).await?;
        debug!(
            "Saved preference {}={} ({} records)",
            record.id,
            record.donation_amount,
            records.len()
        );
        Ok(())
    }

    /// Every stored record, in insertion order.
    pub async fn all(&self) -> Result<Vec<PreferenceRecord>> {
        self.load().await
    }

    async fn load(&self) -> Result<Vec<PreferenceRecord>> {
        match self.medium.get(&self.namespace).await? {
            Some(document) => Ok(serde_json::from_str(&document)?),
            None => Ok(Vec::new()),
        }
    }
}
