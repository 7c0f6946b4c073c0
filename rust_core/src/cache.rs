//! Per-category TTL cache
//!
//! Each category moves through `empty → fresh (store) → stale (ttl elapsed)
//! → fresh (store)`. Entries are replaced wholesale; readers get an `Arc` to
//! the entry and never observe a partial write.

use crate::config::CacheTtls;
use crate::models::{CacheState, CategoryData, DataCategory};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// One cached category
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: CategoryData,
    /// Candidate that served the data
    pub source: String,
    pub is_live: bool,
    /// Wall-clock time reported to callers as `lastUpdated`
    pub fetched_at: DateTime<Utc>,
    /// Monotonic time used for TTL arithmetic
    pub stored_at: Instant,
}

impl CacheEntry {
    pub fn live(data: CategoryData, source: impl Into<String>) -> Self {
        Self {
            data,
            source: source.into(),
            is_live: true,
            fetched_at: Utc::now(),
            stored_at: Instant::now(),
        }
    }

    pub fn age(&self) -> std::time::Duration {
        self.stored_at.elapsed()
    }
}

pub struct CategoryCache {
    ttls: CacheTtls,
    entries: RwLock<HashMap<DataCategory, Arc<CacheEntry>>>,
}

impl CategoryCache {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            ttls,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// True when an entry exists and is younger than the category TTL
    pub fn is_valid(&self, category: DataCategory) -> bool {
        self.entries
            .read()
            .get(&category)
            .map(|entry| entry.age() < self.ttls.for_category(category))
            .unwrap_or(false)
    }

    /// Entry for `category` regardless of age
    pub fn get(&self, category: DataCategory) -> Option<Arc<CacheEntry>> {
        self.entries.read().get(&category).cloned()
    }

    /// Entry for `category` only while it is still valid
    pub fn get_valid(&self, category: DataCategory) -> Option<Arc<CacheEntry>> {
        let ttl = self.ttls.for_category(category);
        let entry = self.get(category)?;
        if entry.age() < ttl {
            debug!("Cache hit for {} (age {:?})", category, entry.age());
            Some(entry)
        } else {
            None
        }
    }

    /// Replace the entry for the data's category
    pub fn store(&self, entry: CacheEntry) -> Arc<CacheEntry> {
        let category = entry.data.category();
        let entry = Arc::new(entry);
        info!(
            "Cached {} {} records from {}",
            entry.data.record_count(),
            category,
            entry.source
        );
        self.entries.write().insert(category, entry.clone());
        entry
    }

    pub fn invalidate(&self, category: DataCategory) {
        if self.entries.write().remove(&category).is_some() {
            debug!("Invalidated {} cache entry", category);
        }
    }

    pub fn invalidate_all(&self) {
        self.entries.write().clear();
        debug!("Invalidated all cache entries");
    }

    /// Valid or expired for every category; missing entries count as expired
    pub fn status(&self) -> BTreeMap<DataCategory, CacheState> {
        DataCategory::ALL
            .iter()
            .map(|&category| {
                let state = if self.is_valid(category) {
                    CacheState::Valid
                } else {
                    CacheState::Expired
                };
                (category, state)
            })
            .collect()
    }

    /// Categories whose entry is missing or stale
    pub fn expired(&self) -> Vec<DataCategory> {
        DataCategory::ALL
            .iter()
            .copied()
            .filter(|&category| !self.is_valid(category))
            .collect()
    }
}
