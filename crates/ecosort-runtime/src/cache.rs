//! Classification result cache.
//!
//! Keyed by the extracted keyword. Only non-empty results are stored so a
//! transient upstream failure is never remembered.

use moka::future::Cache;
use std::time::Duration;

use ecosort_core::ClassificationItem;

pub struct EvidenceCache {
    cache: Cache<String, Vec<ClassificationItem>>,
}

impl EvidenceCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, keyword: &str) -> Option<Vec<ClassificationItem>> {
        self.cache.get(keyword).await
    }

    /// Store `items` under `keyword`. Empty lists are ignored.
    pub async fn insert(&self, keyword: &str, items: Vec<ClassificationItem>) {
        if items.is_empty() {
            return;
        }
        self.cache.insert(keyword.to_string(), items).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate entry count.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for EvidenceCache {
    fn default() -> Self {
        Self::new(1_000, Duration::from_secs(3600))
    }
}
