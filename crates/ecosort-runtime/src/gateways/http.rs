//! Shared HTTP client for public data portal operations.

use serde_json::Value;
use std::time::Duration;

use super::envelope::extract_items;
use super::xml::xml_to_json;
use super::GatewayError;
use crate::providers::ApiCredential;

/// One GET per call, bounded by a timeout, envelope already unwrapped.
pub struct UpstreamClient {
    client: reqwest::Client,
    credential: ApiCredential,
    service_key_encoded: bool,
    timeout: Duration,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("credential", &self.credential)
            .field("service_key_encoded", &self.service_key_encoded)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl UpstreamClient {
    pub fn new(
        credential: ApiCredential,
        service_key_encoded: bool,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            credential,
            service_key_encoded,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `endpoint` and return the normalized item list.
    ///
    /// The request future is dropped when the timeout fires.
    pub async fn get_items(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<Value>, GatewayError> {
        let document = tokio::time::timeout(self.timeout, self.get_document(endpoint, params))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))??;
        extract_items(&document)
    }

    async fn get_document(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, GatewayError> {
        // Portal keys are usually copied pre-encoded; encoding again breaks them
        let request = if self.service_key_encoded {
            let separator = if endpoint.contains('?') { '&' } else { '?' };
            let url = format!(
                "{}{}serviceKey={}",
                endpoint,
                separator,
                self.credential.expose()
            );
            self.client.get(url)
        } else {
            self.client
                .get(endpoint)
                .query(&[("serviceKey", self.credential.expose())])
        };

        let response = request.query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_body(&body)
    }
}

/// Sniff the body format: anything starting with `<` is XML.
pub fn parse_body(body: &str) -> Result<Value, GatewayError> {
    let trimmed = body.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(GatewayError::Malformed("empty body".into()));
    }
    if trimmed.starts_with('<') {
        xml_to_json(trimmed)
    } else {
        serde_json::from_str(trimmed).map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CredentialSource;
    use crate::test_support::spawn_server;
    use axum::{extract::RawQuery, routing::get, Json, Router};
    use serde_json::json;

    fn client(encoded: bool, timeout: Duration) -> UpstreamClient {
        UpstreamClient::new(
            ApiCredential::new("abc%2Bdef%3D%3D", CredentialSource::Programmatic, "key"),
            encoded,
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_encoded_key_sent_verbatim() {
        let router = Router::new().route(
            "/items",
            get(|RawQuery(query): RawQuery| async move {
                let query = query.unwrap_or_default();
                assert!(query.starts_with("serviceKey=abc%2Bdef%3D%3D&"), "{}", query);
                assert!(query.contains("type=json"));
                Json(json!({"response": {"header": {"resultCode": "00"}, "body": {"items": [{"n": 1}]}}}))
            }),
        );
        let base = spawn_server(router).await;

        let items = client(true, Duration::from_secs(5))
            .get_items(&format!("{}/items", base), &[("type", "json".to_string())])
            .await
            .unwrap();
        assert_eq!(items, vec![json!({"n": 1})]);
    }

    #[tokio::test]
    async fn test_raw_key_is_encoded_once() {
        let router = Router::new().route(
            "/items",
            get(|RawQuery(query): RawQuery| async move {
                let query = query.unwrap_or_default();
                assert!(query.contains("serviceKey=abc%252Bdef%253D%253D"), "{}", query);
                Json(json!({"header": {"resultCode": "00"}, "body": {"items": ""}}))
            }),
        );
        let base = spawn_server(router).await;

        let items = client(false, Duration::from_secs(5))
            .get_items(&format!("{}/items", base), &[])
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_xml_body_is_parsed() {
        let router = Router::new().route(
            "/xml",
            get(|| async {
                "<response><header><resultCode>00</resultCode></header>\
                 <body><items><item><dateName>어린이날</dateName></item></items></body></response>"
            }),
        );
        let base = spawn_server(router).await;

        let items = client(true, Duration::from_secs(5))
            .get_items(&format!("{}/xml", base), &[])
            .await
            .unwrap();
        assert_eq!(items, vec![json!({"dateName": "어린이날"})]);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let router = Router::new().route(
            "/missing",
            get(|| async { (axum::http::StatusCode::NOT_FOUND, "no such operation") }),
        );
        let base = spawn_server(router).await;

        let err = client(true, Duration::from_secs(5))
            .get_items(&format!("{}/missing", base), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Status(404)));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
        let base = spawn_server(router).await;

        let err = client(true, Duration::from_millis(100))
            .get_items(&format!("{}/slow", base), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)));
    }

    #[test]
    fn test_parse_body_sniffs_format() {
        assert!(parse_body("  {\"a\": 1}").unwrap().is_object());
        assert!(parse_body("\u{feff}<a>1</a>").unwrap().is_object());
        assert!(parse_body("not json").is_err());
        assert!(parse_body("   ").is_err());
    }
}
