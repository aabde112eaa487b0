//! Collection point gateway.

use async_trait::async_trait;
use std::sync::Arc;

use ecosort_core::{CollectionPoint, LocationDescriptor};

use super::envelope::decode_items;
use super::{log_failure, CollectionPointGateway, UpstreamClient};

const GATEWAY: &str = "collection";

pub struct HttpCollectionPointGateway {
    client: Arc<UpstreamClient>,
    endpoint: String,
    page_size: u32,
}

impl HttpCollectionPointGateway {
    pub fn new(client: Arc<UpstreamClient>, endpoint: impl Into<String>, page_size: u32) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            page_size,
        }
    }
}

#[async_trait]
impl CollectionPointGateway for HttpCollectionPointGateway {
    async fn fetch(&self, location: &LocationDescriptor) -> Vec<CollectionPoint> {
        // Nationwide listings are useless to the user
        if !location.has_region() {
            tracing::debug!(gateway = GATEWAY, "No province in location, skipping");
            return Vec::new();
        }

        let mut params = vec![
            ("pageNo", "1".to_string()),
            ("numOfRows", self.page_size.to_string()),
            ("ctpvNm", location.sido.clone()),
            ("type", "json".to_string()),
        ];
        if !location.sigungu.is_empty() {
            params.push(("sggNm", location.sigungu.clone()));
        }

        let result = self
            .client
            .get_items(&self.endpoint, &params)
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn gateway_with_counter() -> (HttpCollectionPointGateway, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/points",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(params.get("ctpvNm").map(String::as_str), Some("서울특별시"));
                    Json(json!({
                        "header": {"resultCode": "00"},
                        "body": {"items": {"item": [
                            {"bzentyNm": "종로자원", "cltItemNm": "폐가전", "roadNmAddr": "서울특별시 종로구 율곡로 1"},
                            {"bzentyNm": "세종리사이클", "cltItemNm": "고철"}
                        ]}}
                    }))
                }
            }),
        );
        let base = spawn_server(router).await;

        let client = UpstreamClient::new(
            ApiCredential::new("key", CredentialSource::Programmatic, "key"),
            true,
            Duration::from_secs(5),
        )
        .unwrap();
        (
            HttpCollectionPointGateway::new(Arc::new(client), format!("{}/points", base), 10),
            hits,
        )
    }

    #[tokio::test]
    async fn test_fetch_by_region() {
        let (gateway, hits) = gateway_with_counter().await;
        let points = gateway
            .fetch(&LocationDescriptor::parse("서울특별시 종로구 세종대로 175"))
            .await;

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].business_name, "종로자원");
        assert_eq!(points[0].address, "서울특별시 종로구 율곡로 1");
        assert_eq!(points[1].address, "");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_sido_makes_no_call() {
        let (gateway, hits) = gateway_with_counter().await;
        let points = gateway
            .fetch(&LocationDescriptor::parse("알 수 없는 곳"))
            .await;
        assert!(points.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
