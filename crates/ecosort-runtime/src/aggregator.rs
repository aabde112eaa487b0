//! Evidence aggregation.
//!
//! Fans one query out to the classification gateway, the collection point
//! gateway and the local rule lookup under a single `tokio::join!`, then
//! merges what came back. Every branch carries its own timeout so a slow
//! source only costs its own contribution.
//!
//! `timeout` is the budget of one upstream call. The classification branch
//! gets [`CLASSIFICATION_ATTEMPTS`] of them since the gateway may retry the
//! keyword without spaces.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ecosort_core::{AggregatedEvidence, LocationDescriptor, Query, RuleRecord, RuleTable};

use crate::cache::EvidenceCache;
use crate::gateways::{ClassificationGateway, CollectionPointGateway, RegionRuleGateway};

/// Upstream calls one classification lookup may make.
pub const CLASSIFICATION_ATTEMPTS: u32 = 2;

/// Parallel evidence resolver.
pub struct Aggregator {
    classification: Option<Arc<dyn ClassificationGateway>>,
    collection: Option<Arc<dyn CollectionPointGateway>>,
    region: Option<Arc<dyn RegionRuleGateway>>,
    rules: Arc<RuleTable>,
    cache: Option<Arc<EvidenceCache>>,
    timeout: Duration,
}

impl Aggregator {
    /// An aggregator that only knows the local rule table.
    pub fn new(rules: Arc<RuleTable>, timeout: Duration) -> Self {
        Self {
            classification: None,
            collection: None,
            region: None,
            rules,
            cache: None,
            timeout,
        }
    }

    pub fn with_classification(mut self, gateway: Arc<dyn ClassificationGateway>) -> Self {
        self.classification = Some(gateway);
        self
    }

    pub fn with_collection(mut self, gateway: Arc<dyn CollectionPointGateway>) -> Self {
        self.collection = Some(gateway);
        self
    }

    pub fn with_region(mut self, gateway: Arc<dyn RegionRuleGateway>) -> Self {
        self.region = Some(gateway);
        self
    }

    pub fn with_cache(mut self, cache: Arc<EvidenceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Collect all evidence for `query`. Never fails; missing sources
    /// contribute empty lists.
    pub async fn resolve(&self, query: &Query) -> AggregatedEvidence {
        let location = query.location.as_ref();

        let (classification_items, collection_points, local_rules) = tokio::join!(
            self.classify(&query.keyword),
            self.collection_points(location),
            self.local_rules(location),
        );

        tracing::debug!(
            keyword = %query.keyword,
            items = classification_items.len(),
            points = collection_points.len(),
            rules = local_rules.len(),
            "Evidence resolved"
        );

        AggregatedEvidence {
            classification_items,
            collection_points,
            local_rules,
        }
        .dedup()
    }

    /// Rules for a region: the local table first, the live gateway when the
    /// table has nothing.
    pub async fn lookup_rules(&self, sido: &str, sigungu: &str) -> Vec<RuleRecord> {
        let sido = sido.trim();
        let sigungu = sigungu.trim();
        if sido.is_empty() || sigungu.is_empty() {
            return Vec::new();
        }

        let local = self.rules.filter(sido, sigungu);
        if !local.is_empty() {
            return local;
        }

        match &self.region {
            Some(gateway) => {
                bounded("region_rules", self.timeout, gateway.fetch(sido, sigungu)).await
            }
            None => Vec::new(),
        }
    }

    async fn classify(&self, keyword: &str) -> Vec<ecosort_core::ClassificationItem> {
        let Some(gateway) = &self.classification else {
            return Vec::new();
        };
        if keyword.trim().is_empty() {
            return Vec::new();
        }

        if let Some(cache) = &self.cache {
            if let Some(items) = cache.get(keyword).await {
                tracing::debug!(keyword, "Classification cache hit");
                return items;
            }
        }

        let budget = self.timeout * CLASSIFICATION_ATTEMPTS;
        let items = bounded("classification", budget, gateway.fetch(keyword)).await;
        if let Some(cache) = &self.cache {
            cache.insert(keyword, items.clone()).await;
        }
        items
    }

    async fn collection_points(
        &self,
        location: Option<&LocationDescriptor>,
    ) -> Vec<ecosort_core::CollectionPoint> {
        match (&self.collection, location) {
            (Some(gateway), Some(location)) => {
                bounded("collection", self.timeout, gateway.fetch(location)).await
            }
            _ => Vec::new(),
        }
    }

    async fn local_rules(&self, location: Option<&LocationDescriptor>) -> Vec<RuleRecord> {
        match location {
            Some(location) if location.is_complete() => {
                self.lookup_rules(&location.sido, &location.sigungu).await
            }
            _ => Vec::new(),
        }
    }
}

/// Await `fut` for at most `timeout`; an expired branch yields nothing.
async fn bounded<T, F>(branch: &'static str, timeout: Duration, fut: F) -> Vec<T>
where
    F: Future<Output = Vec<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(items) => items,
        Err(_) => {
            tracing::warn!(branch, timeout = ?timeout, "Evidence branch timed out");
            Vec::new()
        }
    }
}
