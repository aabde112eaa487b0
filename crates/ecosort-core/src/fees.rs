//! Large-waste disposal fees.
//!
//! Furniture and other bulky items need a paid sticker before they go out.
//! The fee table maps an item and size to that sticker's cost.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use thiserror::Error;

/// Bundled fee schedule (loaded at compile time).
const BUNDLED_FEES_JSON: &str = include_str!("../data/large_waste_fees.json");

#[derive(Error, Debug)]
pub enum FeeTableError {
    #[error("Failed to read fee file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fee JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One sticker price. `name` is "item_variant", e.g. "소파_3인용".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRecord {
    #[serde(default)]
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub size: String,
    /// Won
    #[serde(deserialize_with = "won_from_number_or_text")]
    pub cost: u32,
}

impl FeeRecord {
    /// Item part of the name ("소파_3인용" → "소파").
    pub fn item(&self) -> &str {
        self.name.split('_').next().unwrap_or(&self.name)
    }

    /// "소파 (3인용): 8,000원"
    pub fn describe(&self) -> String {
        if self.size.is_empty() {
            format!("{}: {}", self.item(), format_won(self.cost))
        } else {
            format!("{} ({}): {}", self.item(), self.size, format_won(self.cost))
        }
    }
}

/// Portals send the cost as a number, "8000" or "8,000원".
fn won_from_number_or_text<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cost {
        Number(u32),
        Text(String),
    }

    match Cost::deserialize(deserializer)? {
        Cost::Number(won) => Ok(won),
        Cost::Text(text) => text
            .trim()
            .trim_end_matches('원')
            .replace(',', "")
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid cost '{}'", text))),
    }
}

/// "8,000원"
pub fn format_won(cost: u32) -> String {
    let digits = cost.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}원", grouped)
}

/// In-memory fee schedule. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct FeeTable {
    records: Vec<FeeRecord>,
}

impl FeeTable {
    pub fn new(records: Vec<FeeRecord>) -> Self {
        Self { records }
    }

    pub fn bundled() -> Result<Self, FeeTableError> {
        Self::from_json_str(BUNDLED_FEES_JSON)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FeeTableError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, FeeTableError> {
        let records: Vec<FeeRecord> = serde_json::from_str(json)?;
        tracing::debug!(records = records.len(), "Loaded fee table");
        Ok(Self { records })
    }

    /// Fees for an item, matched on the name or the exact category.
    /// Spaces are ignored ("책 상" finds "책상"). A blank item lists everything.
    pub fn search(&self, item: &str) -> Vec<FeeRecord> {
        let needle: String = item.chars().filter(|c| !c.is_whitespace()).collect();
        if needle.is_empty() {
            return self.records.clone();
        }

        self.records
            .iter()
            .filter(|fee| fee.name.contains(&needle) || fee.category == needle)
            .cloned()
            .collect()
    }

    pub fn records(&self) -> &[FeeRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
