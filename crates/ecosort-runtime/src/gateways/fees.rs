//! Large-waste fee gateway.
//!
//! Fee schedules are published per local government, so there is no portal
//! default: with no endpoint configured the bundled fee table is used.

use async_trait::async_trait;
use std::sync::Arc;

use ecosort_core::FeeRecord;

use super::envelope::decode_items;
use super::{log_failure, FeeGateway, UpstreamClient};

const GATEWAY: &str = "fees";

pub struct HttpFeeGateway {
    client: Arc<UpstreamClient>,
    endpoint: Option<String>,
    page_size: u32,
}

impl HttpFeeGateway {
    pub fn new(client: Arc<UpstreamClient>, endpoint: Option<String>, page_size: u32) -> Self {
        Self {
            client,
            endpoint,
            page_size,
        }
    }
}

#[async_trait]
impl FeeGateway for HttpFeeGateway {
    async fn fetch(&self) -> Vec<FeeRecord> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Vec::new();
        };

        let params = [
            ("pageNo", "1".to_string()),
            ("numOfRows", self.page_size.to_string()),
            ("type", "json".to_string()),
        ];
        let result = self
            .client
            .get_items(endpoint, &params)
            .await
            .map(|items| decode_items(items, GATEWAY));
        log_failure(GATEWAY, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ApiCredential, CredentialSource};
    use crate::test_support::spawn_server;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn client() -> Arc<UpstreamClient> {
        Arc::new(
            UpstreamClient::new(
                ApiCredential::new("key", CredentialSource::Programmatic, "key"),
                true,
                Duration::from_secs(5),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_unconfigured_endpoint_is_empty() {
        let gateway = HttpFeeGateway::new(client(), None, 100);
        assert!(gateway.fetch().await.is_empty());
    }

    #[tokio::test]
    async fn test_fee_envelope_decoded() {
        let router = Router::new().route(
            "/getFeeList",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("numOfRows").map(String::as_str), Some("100"));
                Json(json!({
                    "response": {
                        "header": {"resultCode": "00", "resultMsg": "NORMAL SERVICE."},
                        "body": {
                            "items": {"item": [
                                {"category": "가구", "name": "소파_3인용", "size": "3인용", "cost": 8000},
                                {"category": "가구", "name": "의자", "size": "", "cost": "2,000원"},
                                {"category": "가구", "size": "이름 없음"}
                            ]},
                            "totalCount": 3
                        }
                    }
                }))
            }),
        );
        let base = spawn_server(router).await;

        let gateway = HttpFeeGateway::new(client(), Some(format!("{}/getFeeList", base)), 100);
        let fees = gateway.fetch().await;

        assert_eq!(fees.len(), 2);
        assert_eq!(fees[0].item(), "소파");
        assert_eq!(fees[1].cost, 2000);
    }
}
