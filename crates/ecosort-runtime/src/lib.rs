//! # ecosort-runtime
//!
//! The networked half of Ecosort: public data gateways, parallel evidence
//! aggregation, Gemini-backed answer synthesis and the small amount of
//! persisted state the assistant keeps.
//!
//! Everything deterministic lives in `ecosort-core`. This crate adds I/O
//! around it and guarantees that an upstream outage degrades an answer
//! instead of failing it: gateways reduce errors to empty evidence and the
//! generator falls back to the core templates.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ecosort_runtime::{Assistant, QueryRequest, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_path("ecosort.yaml")?;
//! let assistant = Assistant::from_config(&config)?;
//!
//! let response = assistant.ask(QueryRequest {
//!     query: "깨진 유리컵은 어떻게 버려요?".into(),
//!     location: Some("서울특별시 종로구".into()),
//!     session_id: None,
//! }).await?;
//! println!("{}", response.message());
//! ```

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod gateways;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod service;
pub mod sessions;
pub mod store;
pub mod synthesizer;

pub use aggregator::Aggregator;
pub use cache::EvidenceCache;
pub use config::{ConfigError, RuntimeConfig};
pub use gateways::{
    ClassificationGateway, CollectionPointGateway, FeeGateway, GatewayError, HolidayGateway,
    RegionRuleGateway,
};
pub use providers::{GenerativeProvider, ProviderError};
pub use service::{
    Assistant, AssistantBuilder, FeeLookup, FeeSource, ImageRequest, QueryRequest, QueryResponse,
    ScheduleLookup, ScheduleSource, ServiceError,
};
pub use sessions::SessionStore;
pub use store::{AddressSlot, FileStore, KeyValueStore, MemoryStore, ScheduleCache, StoreError};
pub use synthesizer::AnswerSynthesizer;

#[cfg(test)]
pub(crate) mod test_support {
    /// Serve `router` on an ephemeral local port and return its base URL.
    pub async fn spawn_server(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
