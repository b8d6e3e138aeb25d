//! Time-bounded memo of aggregate responses.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::models::{AggregateResponse, RegionId, TypeId};

/// Region plus the sorted, de-duplicated item set.
///
/// Requests naming the same items in a different order share a key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    region_id: RegionId,
    type_ids: Vec<TypeId>,
}

impl CacheKey {
    pub fn new(region_id: RegionId, type_ids: &BTreeSet<TypeId>) -> Self {
        Self {
            region_id,
            type_ids: type_ids.iter().copied().collect(),
        }
    }
}

/// Cache entry for one aggregate.
struct CacheEntry {
    response: Arc<AggregateResponse>,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

/// Aggregate cache owned by the aggregator.
///
/// Entries are never modified in place: a refetch stores a new entry that
/// supersedes the old one. Expired entries are dropped whenever a new entry
/// is stored.
pub struct AggregateCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl AggregateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The live entry for `key`, if any. Never mutates the cache.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<AggregateResponse>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_live(self.ttl))
            .map(|entry| Arc::clone(&entry.response))
    }

    /// Store `response` under `key`, replacing any previous entry.
    pub async fn insert(&self, key: CacheKey, response: Arc<AggregateResponse>) {
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(self.ttl));
        if entries.len() < before {
            debug!("Aggregate cache: purged {} expired entries", before - entries.len());
        }

        entries.insert(
            key,
            CacheEntry {
                response,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for `key`. Returns whether one was present.
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(self.ttl))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
