//! Portal response envelopes and the many shapes of `items`.
//!
//! The same operation may answer with `items: [...]`, `items: {item: [...]}`,
//! `items: {item: {...}}`, `items: ""` or no `items` at all depending on the
//! result count and the response format. Everything is folded into one
//! `Vec<Value>` here so gateways never look at the raw shape.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::GatewayError;

/// Result codes the portal uses for success.
const SUCCESS_CODES: &[&str] = &["00", "0", "000"];

/// Observed shapes of the `items` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemsShape {
    /// Field absent or null
    Missing,
    /// `""` or an object with an empty `item`
    Blank,
    /// `items: [...]`
    List(Vec<Value>),
    /// `items: {item: [...]}`
    Wrapped(Vec<Value>),
    /// `items: {item: {...}}` or a bare single object
    Single(Value),
}

impl ItemsShape {
    pub fn classify(items: Option<&Value>) -> Self {
        match items {
            None | Some(Value::Null) => ItemsShape::Missing,
            Some(Value::String(_)) => ItemsShape::Blank,
            Some(Value::Array(list)) => ItemsShape::List(list.clone()),
            Some(Value::Object(map)) => match map.get("item") {
                Some(Value::Array(list)) => ItemsShape::Wrapped(list.clone()),
                Some(Value::Null) | Some(Value::String(_)) => ItemsShape::Blank,
                Some(Value::Object(inner)) if inner.is_empty() => ItemsShape::Blank,
                Some(single) => ItemsShape::Single(single.clone()),
                None if map.is_empty() => ItemsShape::Blank,
                None => ItemsShape::Single(Value::Object(map.clone())),
            },
            Some(other) => ItemsShape::Single(other.clone()),
        }
    }

    /// Canonical list of item values.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            ItemsShape::Missing | ItemsShape::Blank => Vec::new(),
            ItemsShape::List(list) | ItemsShape::Wrapped(list) => list,
            ItemsShape::Single(item) => vec![item],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ItemsShape::Missing | ItemsShape::Blank => true,
            ItemsShape::List(list) | ItemsShape::Wrapped(list) => list.is_empty(),
            ItemsShape::Single(_) => false,
        }
    }
}

/// Check the result code and pull the item list out of a response.
///
/// Accepts `{response: {header, body}}` and a bare `{header, body}`.
pub fn extract_items(document: &Value) -> Result<Vec<Value>, GatewayError> {
    if let Some(fault) = document.get("OpenAPI_ServiceResponse") {
        let header = fault.get("cmmMsgHeader").unwrap_or(fault);
        return Err(GatewayError::Upstream {
            code: text_field(header, "returnReasonCode").unwrap_or_else(|| "unknown".into()),
            message: text_field(header, "returnAuthMsg")
                .or_else(|| text_field(header, "errMsg"))
                .unwrap_or_default(),
        });
    }

    let envelope = document.get("response").unwrap_or(document);

    if let Some(header) = envelope.get("header") {
        if let Some(code) = text_field(header, "resultCode") {
            if !SUCCESS_CODES.contains(&code.as_str()) {
                return Err(GatewayError::Upstream {
                    code,
                    message: text_field(header, "resultMsg").unwrap_or_default(),
                });
            }
        }
    }

    let body = envelope
        .get("body")
        .ok_or_else(|| GatewayError::Malformed("response has no body".into()))?;

    Ok(ItemsShape::classify(body.get("items")).into_items())
}

/// Deserialize each item, skipping the ones that do not fit.
pub fn decode_items<T: DeserializeOwned>(items: Vec<Value>, gateway: &'static str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(gateway, error = %e, "Skipping malformed item");
                None
            }
        })
        .collect()
}

/// String or number field as text.
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
