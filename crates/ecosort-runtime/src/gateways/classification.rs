//! Item classification gateway.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use ecosort_core::ClassificationItem;

use super::envelope::decode_items;
use super::{log_failure, ClassificationGateway, UpstreamClient};

const GATEWAY: &str = "classification";

/// Classification over the portal's recycling item operation.
pub struct HttpClassificationGateway {
    client: Arc<UpstreamClient>,
    endpoint: String,
    page_size: u32,
}

impl HttpClassificationGateway {
    pub fn new(client: Arc<UpstreamClient>, endpoint: impl Into<String>, page_size: u32) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            page_size,
        }
    }

    async fn fetch_once(&self, keyword: &str) -> Vec<ClassificationItem> {
        let params = [
            ("pageNo", "1".to_string()),
            ("numOfRows", self.page_size.to_string()),
            ("itmNm", keyword.to_string()),
            ("type", "json".to_string()),
        ];
        let result = self
            .client
            .get_items(&self.endpoint, &params)
            .await
            .map(|items| decode_items(items, GATEWAY));
        log_failure(GATEWAY, result)
    }
}

#[async_trait]
impl ClassificationGateway for HttpClassificationGateway {
    async fn fetch(&self, keyword: &str) -> Vec<ClassificationItem> {
        fetch_with_compact_retry(keyword, |k| async move { self.fetch_once(&k).await }).await
    }
}

/// Run `fetch`, and when nothing came back for a keyword containing spaces
/// ("피자 박스"), try exactly once more with the spaces removed.
pub async fn fetch_with_compact_retry<F, Fut>(keyword: &str, mut fetch: F) -> Vec<ClassificationItem>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Vec<ClassificationItem>>,
{
    let items = fetch(keyword.to_string()).await;
    if !items.is_empty() || !keyword.trim().chars().any(char::is_whitespace) {
        return items;
    }

    let compact: String = keyword.chars().filter(|c| !c.is_whitespace()).collect();
    tracing::debug!(gateway = GATEWAY, keyword, compact = %compact, "Retrying without whitespace");
    fetch(compact).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ApiCredential, CredentialSource};
    use crate::test_support::spawn_server;
    use axum::{extract::Query, routing::get, Json, Router};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    #[tokio::test]
    async fn test_retry_once_without_whitespace() {
        let calls = Mutex::new(Vec::new());
        let items = fetch_with_compact_retry("피자 박스", |k| {
            calls.lock().push(k.clone());
            async move {
                if k == "피자박스" {
                    vec![ClassificationItem::new("피자박스", "종이류 배출")]
                } else {
                    Vec::new()
                }
            }
        })
        .await;

        assert_eq!(items.len(), 1);
        assert_eq!(*calls.lock(), vec!["피자 박스".to_string(), "피자박스".to_string()]);
    }

    #[tokio::test]
    async fn test_no_retry_for_single_word_or_hit() {
        let calls = Mutex::new(0);
        let items = fetch_with_compact_retry("건전지", |_| {
            *calls.lock() += 1;
            async { Vec::new() }
        })
        .await;
        assert!(items.is_empty());
        assert_eq!(*calls.lock(), 1);

        let calls = Mutex::new(0);
        fetch_with_compact_retry("우유 팩", |_| {
            *calls.lock() += 1;
            async { vec![ClassificationItem::new("우유팩", "종이팩")] }
        })
        .await;
        assert_eq!(*calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_retry_happens_only_once() {
        let calls = Mutex::new(0);
        let items = fetch_with_compact_retry("아무 것 도", |_| {
            *calls.lock() += 1;
            async { Vec::new() }
        })
        .await;
        assert!(items.is_empty());
        assert_eq!(*calls.lock(), 2);
    }

    #[tokio::test]
    async fn test_http_gateway_end_to_end() {
        let router = Router::new().route(
            "/getRecycleList",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let items = if params.get("itmNm").map(String::as_str) == Some("피자박스") {
                    json!({"item": {"itemNm": "피자박스", "dschgMthd": "종이류 배출"}})
                } else {
                    json!("")
                };
                Json(json!({
                    "response": {
                        "header": {"resultCode": "00", "resultMsg": "NORMAL SERVICE."},
                        "body": {"items": items}
                    }
                }))
            }),
        );
        let base = spawn_server(router).await;

        let client = UpstreamClient::new(
            ApiCredential::new("key", CredentialSource::Programmatic, "key"),
            true,
            Duration::from_secs(5),
        )
        .unwrap();
        let gateway =
            HttpClassificationGateway::new(Arc::new(client), format!("{}/getRecycleList", base), 10);

        let items = gateway.fetch("피자 박스").await;
        assert_eq!(items, vec![ClassificationItem::new("피자박스", "종이류 배출")]);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_empty() {
        let client = UpstreamClient::new(
            ApiCredential::new("key", CredentialSource::Programmatic, "key"),
            true,
            Duration::from_millis(500),
        )
        .unwrap();
        let gateway = HttpClassificationGateway::new(Arc::new(client), "http://127.0.0.1:1/none", 10);
        assert!(gateway.fetch("캔").await.is_empty());
    }
}
