//! Region rule gateway.
//!
//! Optional live source for discharge rules. With no endpoint configured
//! it answers nothing and the bundled table is the only rule source.

use async_trait::async_trait;
use std::sync::Arc;

use ecosort_core::RuleRecord;

use super::envelope::decode_items;
use super::{log_failure, RegionRuleGateway, UpstreamClient};

const GATEWAY: &str = "region_rules";

pub struct HttpRegionRuleGateway {
    client: Arc<UpstreamClient>,
    endpoint: Option<String>,
    page_size: u32,
}

impl HttpRegionRuleGateway {
    pub fn new(client: Arc<UpstreamClient>, endpoint: Option<String>, page_size: u32) -> Self {
        Self {
            client,
            endpoint,
            page_size,
        }
    }
}

#[async_trait]
impl RegionRuleGateway for HttpRegionRuleGateway {
    async fn fetch(&self, sido: &str, sigungu: &str) -> Vec<RuleRecord> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Vec::new();
        };
        if sido.is_empty() || sigungu.is_empty() {
            return Vec::new();
        }

        let params = [
            ("pageNo", "1".to_string()),
            ("numOfRows", self.page_size.to_string()),
            ("ctpvNm", sido.to_string()),
            ("sggNm", sigungu.to_string()),
            ("returnType", "json".to_string()),
        ];

        let result = self
            .client
            .get_items(endpoint, &params)
            .await
            .map(|items| decode_items::<RuleRecord>(items, GATEWAY));

        // Live records may omit the region; fill it from the request
        log_failure(GATEWAY, result)
            .into_iter()
            .map(|mut rule| {
                if rule.sido.is_empty() {
                    rule.sido = sido.to_string();
                }
                if rule.sigungu.is_empty() {
                    rule.sigungu = sigungu.to_string();
                }
                rule
            })
            .collect()
    }
}
