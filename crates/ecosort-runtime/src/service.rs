//! The assistant facade used by the CLI and the HTTP server.
//!
//! [`Assistant`] owns every moving part: gateways, the rule table, the
//! aggregator, the synthesizer, the key-value store and the session logs.
//! Build it from a [`RuntimeConfig`] or piece by piece with
//! [`AssistantBuilder`].

use base64::Engine;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use ecosort_core::{
    collection_alert, derive_schedule, extract_keyword, resolve_query, AggregatedEvidence,
    AnswerKind, ClassificationItem, Conversation, CoreError, DischargeSchedule, FeeRecord,
    FeeTable, FeeTableError, Holiday, LocationDescriptor, Message, RegionSummary, RuleRecord,
    RuleTable, RuleTableError,
};

use crate::aggregator::Aggregator;
use crate::cache::EvidenceCache;
use crate::config::RuntimeConfig;
use crate::gateways::{
    ClassificationGateway, CollectionPointGateway, FeeGateway, HolidayGateway,
    HttpClassificationGateway, HttpCollectionPointGateway, HttpFeeGateway, HttpHolidayGateway,
    HttpRegionRuleGateway, RegionRuleGateway, UpstreamClient,
};
use crate::providers::{GeminiProvider, GenerationConfig, GenerativeProvider, ProviderError};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, RetryPolicy};
use crate::sessions::SessionStore;
use crate::store::{AddressSlot, FileStore, KeyValueStore, MemoryStore, ScheduleCache, StoreError};
use crate::synthesizer::AnswerSynthesizer;

/// Errors surfaced to callers of the assistant.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Bad or missing input from the caller
    #[error("{0}")]
    InvalidInput(String),

    /// A credential or component is missing
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to analyze image: {0}")]
    AnalysisFailed(String),

    #[error("Rule table error: {0}")]
    Rules(#[from] RuleTableError),

    #[error("Fee table error: {0}")]
    Fees(#[from] FeeTableError),

    #[error("Store error: {0}")]
    Storage(#[from] StoreError),
}

impl From<CoreError> for ServiceError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidInput(message) => ServiceError::InvalidInput(message),
            CoreError::RuleTable(e) => ServiceError::Rules(e),
            CoreError::FeeTable(e) => ServiceError::Fees(e),
        }
    }
}

impl ServiceError {
    /// Caller mistakes as opposed to server-side trouble.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::InvalidInput(_))
    }
}

/// A text question.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Reply to a text question.
///
/// `gemini` carries generated text with the evidence it was grounded on;
/// `list` carries templated text and the items behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "resultType",
    rename_all = "lowercase",
    rename_all_fields = "camelCase"
)]
pub enum QueryResponse {
    Gemini {
        message: String,
        evidence: AggregatedEvidence,
        keyword: String,
        session_id: String,
    },
    List {
        items: Vec<ClassificationItem>,
        message: String,
        keyword: String,
        session_id: String,
    },
}

impl QueryResponse {
    pub fn message(&self) -> &str {
        match self {
            QueryResponse::Gemini { message, .. } | QueryResponse::List { message, .. } => message,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            QueryResponse::Gemini { session_id, .. } | QueryResponse::List { session_id, .. } => {
                session_id
            }
        }
    }
}

/// A photo to identify. `image` is base64, optionally as a data URL.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Where a schedule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleSource {
    /// Derived from rules found just now
    Live,
    /// Last saved schedule for the region
    Cached,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleLookup {
    pub schedule: Option<DischargeSchedule>,
    pub source: ScheduleSource,
}

/// Where fee prices came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeSource {
    Live,
    Bundled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeLookup {
    /// Item the fees were matched on; empty when everything is listed
    pub item: String,
    pub fees: Vec<FeeRecord>,
    pub source: FeeSource,
}

pub struct Assistant {
    aggregator: Aggregator,
    synthesizer: AnswerSynthesizer,
    holidays: Option<Arc<dyn HolidayGateway>>,
    fees: Arc<FeeTable>,
    fee_gateway: Option<Arc<dyn FeeGateway>>,
    store: Arc<dyn KeyValueStore>,
    sessions: SessionStore,
    seed: AtomicU64,
    /// Set when built from config without a data portal key
    missing_data_key: bool,
}

impl Assistant {
    pub fn builder() -> AssistantBuilder {
        AssistantBuilder::new()
    }

    /// Wire everything from configuration.
    ///
    /// Missing credentials do not fail construction; the operations that
    /// need them report [`ServiceError::NotConfigured`] instead.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ServiceError> {
        let rules = match &config.rules.path {
            Some(path) => RuleTable::from_path(path)?,
            None => RuleTable::bundled()?,
        };
        let fees = match &config.rules.fees_path {
            Some(path) => FeeTable::from_path(path)?,
            None => FeeTable::bundled()?,
        };

        let mut builder = AssistantBuilder::new()
            .rules(Arc::new(rules))
            .fee_table(Arc::new(fees))
            .timeout(config.upstream.timeout)
            .cache(Arc::new(EvidenceCache::new(
                config.cache.max_entries,
                config.cache.ttl,
            )))
            .retry(config.retry.clone())
            .circuit_breaker(config.circuit_breaker.clone());

        let upstream = &config.upstream;
        match config.data_credential() {
            Some(credential) => {
                let client = UpstreamClient::new(
                    credential,
                    upstream.service_key_encoded,
                    upstream.timeout,
                )
                .map_err(|e| ServiceError::NotConfigured(format!("upstream client: {}", e)))?;
                let client = Arc::new(client);

                builder = builder
                    .classification(Arc::new(HttpClassificationGateway::new(
                        client.clone(),
                        upstream.classification_endpoint.clone(),
                        upstream.page_size,
                    )))
                    .collection(Arc::new(HttpCollectionPointGateway::new(
                        client.clone(),
                        upstream.collection_endpoint.clone(),
                        upstream.page_size,
                    )))
                    .holidays(Arc::new(HttpHolidayGateway::new(
                        client.clone(),
                        upstream.holiday_endpoint.clone(),
                    )));

                if upstream.region_rules_endpoint.is_some() {
                    builder = builder.region(Arc::new(HttpRegionRuleGateway::new(
                        client.clone(),
                        upstream.region_rules_endpoint.clone(),
                        upstream.page_size,
                    )));
                }
                if upstream.fee_endpoint.is_some() {
                    builder = builder.fees(Arc::new(HttpFeeGateway::new(
                        client,
                        upstream.fee_endpoint.clone(),
                        FEE_PAGE_SIZE,
                    )));
                }
            }
            None => {
                tracing::warn!("No data portal API key; item lookups are disabled");
                builder.missing_data_key = true;
            }
        }

        if config.generator.is_enabled() {
            match config.generator_credential() {
                Some(credential) => {
                    let provider = GeminiProvider::new(credential)
                        .map_err(|e| ServiceError::NotConfigured(format!("gemini: {}", e)))?
                        .with_base_url(config.generator.base_url.clone());
                    let generation = GenerationConfig {
                        model: config.generator.model.clone(),
                        temperature: config.generator.temperature,
                        max_output_tokens: config.generator.max_output_tokens,
                        timeout: config.generator.timeout,
                    };
                    builder = builder.provider(Arc::new(provider), generation);
                }
                None => tracing::warn!("No Gemini API key; answers use templates only"),
            }
        }

        let store: Arc<dyn KeyValueStore> = match &config.store.path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };

        builder.store(store).build()
    }

    /// Answer a text question and log both turns to the session.
    pub async fn ask(&self, request: QueryRequest) -> Result<QueryResponse, ServiceError> {
        let location = request
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(LocationDescriptor::parse);
        let query = resolve_query(&request.query, location)?;

        if self.missing_data_key {
            return Err(ServiceError::NotConfigured(
                "DATA_GO_KR_API_KEY is not set".to_string(),
            ));
        }

        let evidence = self.aggregator.resolve(&query).await;
        if let Some(location) = query.location.as_ref().filter(|l| l.is_complete()) {
            if !evidence.local_rules.is_empty() {
                self.remember_schedule(&location.sido, &location.sigungu, &evidence.local_rules);
            }
        }

        let seed = self.seed.fetch_add(1, Ordering::Relaxed);
        let answer = self.synthesizer.answer(&query, &evidence, seed).await;

        let session_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.sessions.append(&session_id, Message::user(query.raw_text.clone()));
        self.sessions.append(
            &session_id,
            Message::assistant(answer.message.clone(), answer.source_label.clone()),
        );

        tracing::info!(
            keyword = %query.keyword,
            modifier = ?query.modifier,
            kind = ?answer.kind,
            session = %session_id,
            "Answered query"
        );

        Ok(match answer.kind {
            AnswerKind::Generated => QueryResponse::Gemini {
                message: answer.message,
                evidence,
                keyword: query.keyword,
                session_id,
            },
            _ => QueryResponse::List {
                items: answer.items,
                message: answer.message,
                keyword: query.keyword,
                session_id,
            },
        })
    }

    /// Identify the item in a photo and explain how to discard it.
    pub async fn describe_image(&self, request: ImageRequest) -> Result<String, ServiceError> {
        let image = strip_data_url(&request.image);
        if image.is_empty() {
            return Err(ServiceError::InvalidInput("image is required".to_string()));
        }
        base64::engine::general_purpose::STANDARD
            .decode(image)
            .map_err(|e| ServiceError::InvalidInput(format!("image is not valid base64: {}", e)))?;

        let location = request.location.as_deref();
        self.synthesizer
            .describe_image(image, location)
            .await
            .map_err(|e| match e {
                ProviderError::NotConfigured(message) => ServiceError::NotConfigured(message),
                other => {
                    tracing::error!(error = %other, "Image analysis failed");
                    ServiceError::AnalysisFailed(other.to_string())
                }
            })
    }

    /// Discharge rules for a region.
    pub async fn lookup_rules(
        &self,
        sido: &str,
        sigungu: &str,
    ) -> Result<Vec<RuleRecord>, ServiceError> {
        if sido.trim().is_empty() || sigungu.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "sido and sigungu are required".to_string(),
            ));
        }
        Ok(self.aggregator.lookup_rules(sido, sigungu).await)
    }

    /// Weekly schedule for a region, live if possible, else the last saved.
    pub async fn lookup_schedule(
        &self,
        sido: &str,
        sigungu: &str,
    ) -> Result<ScheduleLookup, ServiceError> {
        let rules = self.lookup_rules(sido, sigungu).await?;
        if !rules.is_empty() {
            let schedule = self.remember_schedule(sido, sigungu, &rules);
            return Ok(ScheduleLookup {
                schedule: Some(schedule),
                source: ScheduleSource::Live,
            });
        }

        Ok(match ScheduleCache::new(self.store.as_ref()).load(sido, sigungu) {
            Some(schedule) => ScheduleLookup {
                schedule: Some(schedule),
                source: ScheduleSource::Cached,
            },
            None => ScheduleLookup {
                schedule: None,
                source: ScheduleSource::None,
            },
        })
    }

    pub async fn lookup_holidays(&self, year: i32, month: u32) -> Result<Vec<Holiday>, ServiceError> {
        if !(1..=12).contains(&month) {
            return Err(ServiceError::InvalidInput(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        if !(1900..=2100).contains(&year) {
            return Err(ServiceError::InvalidInput(format!("year {} is out of range", year)));
        }

        let gateway = self.holidays.as_ref().ok_or_else(|| {
            ServiceError::NotConfigured("holiday lookup needs DATA_GO_KR_API_KEY".to_string())
        })?;
        Ok(gateway.fetch(year, month).await)
    }

    /// Large-waste sticker prices for an item.
    ///
    /// `item` may be a whole question ("소파 버리는 비용 얼마예요?"); it goes
    /// through keyword extraction first. A blank item lists every fee. The
    /// live fee list wins when it answers, else the bundled table is used.
    pub async fn lookup_fees(&self, item: &str) -> FeeLookup {
        let item = match item.trim() {
            "" => String::new(),
            text => extract_keyword(text).keyword,
        };

        if let Some(gateway) = &self.fee_gateway {
            let live = FeeTable::new(gateway.fetch().await);
            if !live.is_empty() {
                return FeeLookup {
                    fees: live.search(&item),
                    item,
                    source: FeeSource::Live,
                };
            }
        }

        FeeLookup {
            fees: self.fees.search(&item),
            item,
            source: FeeSource::Bundled,
        }
    }

    /// Collection summary for an address with today's alert.
    ///
    /// Without a location the saved home address is used.
    pub async fn region_info(
        &self,
        location: Option<&str>,
        today: NaiveDate,
    ) -> Result<RegionSummary, ServiceError> {
        let location = match location.map(str::trim).filter(|l| !l.is_empty()) {
            Some(location) => location.to_string(),
            None => self.address(AddressSlot::Home).ok_or_else(|| {
                ServiceError::InvalidInput("loc is required (or save a home address)".to_string())
            })?,
        };

        let region = LocationDescriptor::parse(&location);
        if !region.is_complete() {
            return Err(ServiceError::InvalidInput(format!(
                "'{}' does not name a province and district",
                location
            )));
        }

        let rules = self.aggregator.lookup_rules(&region.sido, &region.sigungu).await;
        let holidays = match &self.holidays {
            Some(gateway) => gateway.fetch(today.year(), today.month()).await,
            None => Vec::new(),
        };
        let alert = collection_alert(&rules, today, &holidays);

        Ok(RegionSummary::build(&region.raw_text, &rules, alert))
    }

    pub fn set_address(&self, slot: AddressSlot, text: &str) -> Result<(), ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::InvalidInput("address is empty".to_string()));
        }
        self.store.set(slot.key(), text)?;
        Ok(())
    }

    pub fn address(&self, slot: AddressSlot) -> Option<String> {
        self.store.get(slot.key())
    }

    pub fn conversation(&self, session_id: &str) -> Conversation {
        self.sessions.get(session_id)
    }

    pub fn has_generator(&self) -> bool {
        self.synthesizer.has_provider()
    }

    /// Derive and persist the schedule. Store failures are only logged.
    fn remember_schedule(&self, sido: &str, sigungu: &str, rules: &[RuleRecord]) -> DischargeSchedule {
        let schedule = derive_schedule(rules);
        if let Err(e) = ScheduleCache::new(self.store.as_ref()).save(sido, sigungu, &schedule) {
            tracing::warn!(sido, sigungu, error = %e, "Failed to cache schedule");
        }
        schedule
    }
}

/// Drop a `data:image/jpeg;base64,` prefix and surrounding whitespace.
fn strip_data_url(image: &str) -> &str {
    let image = image.trim();
    match image.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(""),
        None => image,
    }
}

/// Fee lists are short; one page holds a whole schedule.
const FEE_PAGE_SIZE: u32 = 100;

/// Assemble an [`Assistant`] from explicit parts.
pub struct AssistantBuilder {
    rules: Option<Arc<RuleTable>>,
    fee_table: Option<Arc<FeeTable>>,
    fees: Option<Arc<dyn FeeGateway>>,
    classification: Option<Arc<dyn ClassificationGateway>>,
    collection: Option<Arc<dyn CollectionPointGateway>>,
    region: Option<Arc<dyn RegionRuleGateway>>,
    holidays: Option<Arc<dyn HolidayGateway>>,
    provider: Option<(Arc<dyn GenerativeProvider>, GenerationConfig)>,
    store: Option<Arc<dyn KeyValueStore>>,
    cache: Option<Arc<EvidenceCache>>,
    timeout: Duration,
    retry: RetryPolicy,
    circuit_breaker: CircuitBreakerConfig,
    missing_data_key: bool,
}

impl Default for AssistantBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AssistantBuilder {
    pub fn new() -> Self {
        Self {
            rules: None,
            fee_table: None,
            fees: None,
            classification: None,
            collection: None,
            region: None,
            holidays: None,
            provider: None,
            store: None,
            cache: None,
            timeout: Duration::from_millis(2500),
            retry: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            missing_data_key: false,
        }
    }

    pub fn rules(mut self, rules: Arc<RuleTable>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn fee_table(mut self, fees: Arc<FeeTable>) -> Self {
        self.fee_table = Some(fees);
        self
    }

    pub fn classification(mut self, gateway: Arc<dyn ClassificationGateway>) -> Self {
        self.classification = Some(gateway);
        self
    }

    pub fn collection(mut self, gateway: Arc<dyn CollectionPointGateway>) -> Self {
        self.collection = Some(gateway);
        self
    }

    pub fn region(mut self, gateway: Arc<dyn RegionRuleGateway>) -> Self {
        self.region = Some(gateway);
        self
    }

    pub fn fees(mut self, gateway: Arc<dyn FeeGateway>) -> Self {
        self.fees = Some(gateway);
        self
    }

    pub fn holidays(mut self, gateway: Arc<dyn HolidayGateway>) -> Self {
        self.holidays = Some(gateway);
        self
    }

    pub fn provider(
        mut self,
        provider: Arc<dyn GenerativeProvider>,
        generation: GenerationConfig,
    ) -> Self {
        self.provider = Some((provider, generation));
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn cache(mut self, cache: Arc<EvidenceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Per-branch evidence timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    pub fn build(self) -> Result<Assistant, ServiceError> {
        let rules = match self.rules {
            Some(rules) => rules,
            None => Arc::new(RuleTable::bundled()?),
        };
        let fees = match self.fee_table {
            Some(fees) => fees,
            None => Arc::new(FeeTable::bundled()?),
        };

        let mut aggregator = Aggregator::new(rules, self.timeout);
        if let Some(gateway) = self.classification {
            aggregator = aggregator.with_classification(gateway);
        }
        if let Some(gateway) = self.collection {
            aggregator = aggregator.with_collection(gateway);
        }
        if let Some(gateway) = self.region {
            aggregator = aggregator.with_region(gateway);
        }
        if let Some(cache) = self.cache {
            aggregator = aggregator.with_cache(cache);
        }

        let synthesizer = match self.provider {
            Some((provider, generation)) => AnswerSynthesizer::with_provider(
                provider,
                generation,
                Arc::new(CircuitBreaker::new(self.circuit_breaker)),
                self.retry,
            ),
            None => AnswerSynthesizer::deterministic(),
        };

        Ok(Assistant {
            aggregator,
            synthesizer,
            holidays: self.holidays,
            fees,
            fee_gateway: self.fees,
            store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            sessions: SessionStore::new(),
            seed: AtomicU64::new(0),
            missing_data_key: self.missing_data_key,
        })
    }
}
