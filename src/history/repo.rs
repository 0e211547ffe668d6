use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::nutrition::{FoodLogEntry, NewFoodLogEntry};
use crate::storage::KeyValueStore;

/// Everything except `InvalidEntry` is reported to callers as a storage failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
    #[error("storage unavailable: {0:#}")]
    Unavailable(anyhow::Error),
    #[error("stored history is corrupted: {0}")]
    Corrupted(serde_json::Error),
    #[error("failed to encode history: {0}")]
    Encode(serde_json::Error),
}

impl StoreError {
    pub fn is_storage_failure(&self) -> bool {
        !matches!(self, StoreError::InvalidEntry(_))
    }
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Append-only food log kept as a single JSON array under one key.
pub struct NutritionStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    user_id_hash: String,
    write_lock: Mutex<()>,
}

impl NutritionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>, user_id_hash: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            user_id_hash: user_id_hash.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<FoodLogEntry>, StoreError> {
        let raw = self.kv.get(&self.key).await.map_err(StoreError::Unavailable)?;
        match raw {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(StoreError::Corrupted),
        }
    }

    /// Assigns id and timestamp, then rewrites the full log. On any failure the
    /// previously stored record is left untouched.
    #[instrument(skip(self, entry), fields(food = %entry.food_name, method = %entry.method))]
    pub async fn append(&self, entry: NewFoodLogEntry) -> Result<FoodLogEntry, StoreError> {
        entry.validate().map_err(StoreError::InvalidEntry)?;

        let _guard = self.write_lock.lock().await;
        let mut logs = self.load().await.map_err(|e| {
            error!(error = %e, key = %self.key, "cannot read history before append");
            e
        })?;

        let finalized = FoodLogEntry {
            id: Uuid::new_v4(),
            user_id_hash: self.user_id_hash.clone(),
            timestamp: now_millis(),
            food_name: entry.food_name,
            protein: entry.protein,
            weight: entry.weight,
            method: entry.method,
        };
        logs.push(finalized.clone());

        let encoded = serde_json::to_string(&logs).map_err(StoreError::Encode)?;
        self.kv.put(&self.key, &encoded).await.map_err(|e| {
            error!(error = %e, key = %self.key, "history write failed");
            StoreError::Unavailable(e)
        })?;

        debug!(id = %finalized.id, total = logs.len(), "entry appended");
        Ok(finalized)
    }

    /// Insertion-ordered log. Unreadable state degrades to an empty log.
    pub async fn all_entries(&self) -> Vec<FoodLogEntry> {
        match self.load().await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(error = %e, key = %self.key, "history unreadable; serving empty log");
                Vec::new()
            }
        }
    }

    /// Sum of protein over entries with `timestamp >= since_ms`.
    pub async fn aggregate_since(&self, since_ms: i64) -> f64 {
        sum_protein_since(&self.all_entries().await, since_ms)
    }
}

pub fn sum_protein_since(entries: &[FoodLogEntry], since_ms: i64) -> f64 {
    entries
        .iter()
        .filter(|e| e.timestamp >= since_ms)
        .map(|e| e.protein)
        .sum()
}
