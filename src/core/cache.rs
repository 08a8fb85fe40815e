//! Signals to the read-side cache after a drain changed server state.

use crate::db::queries::format_timestamp;
use crate::db::store::QueueStore;
use crate::errors::AppResult;
use crate::models::action::QueryKey;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

pub const INVALIDATED_PREFIX: &str = "invalidated:";

pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, keys: &[QueryKey]) -> AppResult<()>;
}

/// Stamps `meta.invalidated:<query>` with the drain time; readers refetch
/// any query whose stamp is newer than their cached copy.
pub struct StoreInvalidator {
    store: Arc<QueueStore>,
}

impl StoreInvalidator {
    pub fn new(store: Arc<QueueStore>) -> Self {
        Self { store }
    }

    pub fn stamps(store: &QueueStore) -> AppResult<Vec<(String, String)>> {
        Ok(store
            .meta_with_prefix(INVALIDATED_PREFIX)?
            .into_iter()
            .map(|(k, v)| (k.trim_start_matches(INVALIDATED_PREFIX).to_string(), v))
            .collect())
    }

    fn stamp(&self, key: QueryKey, at: DateTime<Utc>) -> AppResult<()> {
        self.store.set_meta(
            &format!("{INVALIDATED_PREFIX}{}", key.as_str()),
            &format_timestamp(&at),
        )
    }
}

impl CacheInvalidator for StoreInvalidator {
    fn invalidate(&self, keys: &[QueryKey]) -> AppResult<()> {
        let now = Utc::now();
        for key in keys {
            self.stamp(*key, now)?;
            debug!(query = key.as_str(), "query invalidated");
        }
        Ok(())
    }
}
