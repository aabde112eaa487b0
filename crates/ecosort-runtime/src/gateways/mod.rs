//! Upstream data gateways.
//!
//! Each gateway wraps one external data source and is infallible at its
//! boundary: network failures, timeouts, bad status codes, malformed
//! payloads and upstream error codes are logged and reduce to an empty
//! list. [`GatewayError`] never leaves this module.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use ecosort_core::{
    ClassificationItem, CollectionPoint, FeeRecord, Holiday, LocationDescriptor, RuleRecord,
};

mod classification;
mod collection;
pub mod envelope;
mod fees;
mod holiday;
mod http;
mod region;
pub mod xml;

pub use classification::{fetch_with_compact_retry, HttpClassificationGateway};
pub use collection::HttpCollectionPointGateway;
pub use envelope::ItemsShape;
pub use fees::HttpFeeGateway;
pub use holiday::HttpHolidayGateway;
pub use http::UpstreamClient;
pub use region::HttpRegionRuleGateway;

/// Failures inside a gateway call.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Upstream error {code}: {message}")]
    Upstream { code: String, message: String },
}

/// Item name → disposal guidance.
#[async_trait]
pub trait ClassificationGateway: Send + Sync {
    async fn fetch(&self, keyword: &str) -> Vec<ClassificationItem>;
}

/// Location → licensed collection businesses.
#[async_trait]
pub trait CollectionPointGateway: Send + Sync {
    async fn fetch(&self, location: &LocationDescriptor) -> Vec<CollectionPoint>;
}

/// Province and district → discharge rules.
#[async_trait]
pub trait RegionRuleGateway: Send + Sync {
    async fn fetch(&self, sido: &str, sigungu: &str) -> Vec<RuleRecord>;
}

/// Year and month → public holidays.
#[async_trait]
pub trait HolidayGateway: Send + Sync {
    async fn fetch(&self, year: i32, month: u32) -> Vec<Holiday>;
}

/// Large-waste sticker prices for the configured local government.
#[async_trait]
pub trait FeeGateway: Send + Sync {
    async fn fetch(&self) -> Vec<FeeRecord>;
}

/// Log a gateway failure and collapse it to nothing.
pub(crate) fn log_failure<T>(gateway: &'static str, result: Result<Vec<T>, GatewayError>) -> Vec<T> {
    match result {
        Ok(items) => {
            if items.is_empty() {
                tracing::debug!(gateway, "Upstream returned no items");
            }
            items
        }
        Err(GatewayError::Timeout(after)) => {
            tracing::warn!(gateway, timeout = ?after, "Upstream call timed out");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(gateway, error = %e, "Upstream call failed");
            Vec::new()
        }
    }
}
