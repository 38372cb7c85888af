//! Short-lived cache of account-info lookups

use std::time::Duration;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use tracing::debug;

use crate::blockchain::models::RemoteAccount;

/// Most recent account-info fetch per address. Absent accounts are cached as `None`.
#[derive(Clone)]
pub struct AccountCache {
    cache: Cache<String, Option<RemoteAccount>>,
}

impl AccountCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { cache }
    }

    /// Outer `None` is a miss, `Some(None)` a cached absence.
    pub async fn get(&self, address: &str) -> Option<Option<RemoteAccount>> {
        let result = self.cache.get(address).await;
        if result.is_some() {
            debug!("Account cache hit: {}", address);
        }
        result
    }

    pub async fn insert(&self, address: &str, account: Option<RemoteAccount>) {
        self.cache.insert(address.to_string(), account).await;
    }

    pub async fn invalidate(&self, address: &str) {
        self.cache.invalidate(address).await;
        debug!("Invalidated cached account: {}", address);
    }

    /// Approximate entry count after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}
