//! Core types for Ecosort query resolution.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::keyword::extract_keyword;

/// Situational qualifier detected in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    #[default]
    None,
    /// Food residue or other contamination
    Dirty,
    /// Broken glass, ceramics and the like
    Broken,
    /// Leftover liquid or contents
    Liquid,
    /// Oil residue
    Oily,
}

impl Modifier {
    pub fn is_none(&self) -> bool {
        matches!(self, Modifier::None)
    }
}

/// Province aliases expanded to the official names used by the rule table.
const SIDO_ALIASES: &[(&str, &str)] = &[
    ("서울", "서울특별시"),
    ("부산", "부산광역시"),
    ("대구", "대구광역시"),
    ("인천", "인천광역시"),
    ("광주", "광주광역시"),
    ("대전", "대전광역시"),
    ("울산", "울산광역시"),
    ("세종", "세종특별자치시"),
    ("경기", "경기도"),
    ("강원", "강원특별자치도"),
    ("충북", "충청북도"),
    ("충남", "충청남도"),
    ("전북", "전북특별자치도"),
    ("전남", "전라남도"),
    ("경북", "경상북도"),
    ("경남", "경상남도"),
    ("제주", "제주특별자치도"),
];

/// Where the user is, as far as rule matching is concerned.
///
/// `sido` and `sigungu` are empty strings when the raw text could not be
/// parsed. Callers check emptiness, never absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LocationDescriptor {
    pub sido: String,
    pub sigungu: String,
    pub raw_text: String,
}

impl LocationDescriptor {
    pub fn new(
        sido: impl Into<String>,
        sigungu: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            sido: sido.into(),
            sigungu: sigungu.into(),
            raw_text: raw_text.into(),
        }
    }

    /// Parse a free-form address such as "서울시 종로구 세종대로 175".
    pub fn parse(raw: &str) -> Self {
        let raw_text = raw.trim().to_string();
        let mut tokens = raw_text.split_whitespace().peekable();

        let mut sido = String::new();
        while let Some(token) = tokens.next() {
            if let Some(official) = normalize_sido(token) {
                sido = official;
                break;
            }
        }

        let mut sigungu = String::new();
        if !sido.is_empty() {
            if let Some(token) = tokens.peek() {
                if ["시", "군", "구"].iter().any(|suffix| token.ends_with(suffix))
                    && token.chars().count() > 1
                {
                    sigungu = token.to_string();
                }
            }
        }

        Self {
            sido,
            sigungu,
            raw_text,
        }
    }

    /// Region parts given separately, with a short province name expanded.
    pub fn from_parts(sido: &str, sigungu: &str) -> Self {
        let (sido, sigungu) = (sido.trim(), sigungu.trim());
        Self {
            sido: normalize_sido(sido).unwrap_or_else(|| sido.to_string()),
            sigungu: sigungu.to_string(),
            raw_text: format!("{} {}", sido, sigungu).trim().to_string(),
        }
    }

    /// True when a province could be determined.
    pub fn has_region(&self) -> bool {
        !self.sido.is_empty()
    }

    /// True when both region parts are known.
    pub fn is_complete(&self) -> bool {
        !self.sido.is_empty() && !self.sigungu.is_empty()
    }
}

fn normalize_sido(token: &str) -> Option<String> {
    for (short, official) in SIDO_ALIASES {
        if token == *official || token == *short {
            return Some(official.to_string());
        }
        // "서울시", "경기도" and similar short forms
        if let Some(stem) = token.strip_suffix('시').or_else(|| token.strip_suffix('도')) {
            if stem == *short {
                return Some(official.to_string());
            }
        }
    }
    if (token.ends_with("특별시") || token.ends_with("광역시") || token.ends_with("자치시"))
        || (token.ends_with('도') && token.chars().count() >= 3)
    {
        return Some(token.to_string());
    }
    None
}

/// A single user turn, fully resolved and immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub raw_text: String,
    pub modifier: Modifier,
    pub keyword: String,
    pub location: Option<LocationDescriptor>,
}

impl Query {
    /// Run the keyword extractor over `raw` and attach the location.
    pub fn build(raw: &str, location: Option<LocationDescriptor>) -> Self {
        let extraction = extract_keyword(raw);
        Self {
            raw_text: raw.trim().to_string(),
            modifier: extraction.modifier,
            keyword: extraction.keyword,
            location,
        }
    }

    /// Location text for prompts and logs.
    pub fn location_text(&self) -> &str {
        self.location
            .as_ref()
            .map(|l| l.raw_text.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or("알 수 없음")
    }
}

/// Discharge rules for one administrative sub-unit.
///
/// Accepts both the camelCase names and the short keys of the public
/// dataset (`gnrlWsteDschrgDay` and so on).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleRecord {
    pub sido: String,
    pub sigungu: String,
    #[serde(alias = "emdNm")]
    pub emd_name: String,
    #[serde(alias = "gnrlWsteDschrgDay")]
    pub general_waste_day: String,
    #[serde(alias = "gnrlWsteDschrgMthd")]
    pub general_waste_method: String,
    #[serde(alias = "gnrlWsteDschrgTime")]
    pub general_waste_time: String,
    #[serde(alias = "foodWsteDschrgDay")]
    pub food_waste_day: String,
    #[serde(alias = "foodWsteDschrgMthd")]
    pub food_waste_method: String,
    #[serde(alias = "foodWsteDschrgTime")]
    pub food_waste_time: String,
    #[serde(alias = "recycleDschrgDay")]
    pub recycle_day: String,
    #[serde(alias = "recycleDschrgMthd")]
    pub recycle_method: String,
    #[serde(alias = "recycleDschrgTime")]
    pub recycle_time: String,
    #[serde(alias = "dschrgPlace")]
    pub discharge_place: String,
    pub no_collection_day: String,
    /// Bulky item pickup days, when the district publishes them
    pub large_waste_day: String,
    pub large_waste_method: String,
    pub contact: String,
}

impl RuleRecord {
    /// Lenient region match: both parts must be contained in the record.
    pub fn matches(&self, sido: &str, sigungu: &str) -> bool {
        self.sido.contains(sido) && self.sigungu.contains(sigungu)
    }

    /// Day field for a waste category.
    pub fn day_field(&self, category: WasteCategory) -> &str {
        match category {
            WasteCategory::General => &self.general_waste_day,
            WasteCategory::Food => &self.food_waste_day,
            WasteCategory::Recyclable => &self.recycle_day,
        }
    }
}

/// Waste streams a rule record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasteCategory {
    General,
    Food,
    Recyclable,
}

impl WasteCategory {
    pub const ALL: [WasteCategory; 3] = [
        WasteCategory::General,
        WasteCategory::Food,
        WasteCategory::Recyclable,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WasteCategory::General => "일반쓰레기",
            WasteCategory::Food => "음식물쓰레기",
            WasteCategory::Recyclable => "재활용품",
        }
    }
}

/// Item-level disposal guidance from the classification gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationItem {
    #[serde(alias = "itemNm", alias = "itmNm")]
    pub item_name: String,
    #[serde(alias = "dschgMthd")]
    pub discharge_method: String,
    #[serde(default, alias = "cn", skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

impl ClassificationItem {
    pub fn new(item_name: impl Into<String>, discharge_method: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            discharge_method: discharge_method.into(),
            contents: None,
        }
    }
}

/// A licensed business that collects recyclables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPoint {
    #[serde(alias = "bzentyNm")]
    pub business_name: String,
    #[serde(default, alias = "cltItemNm", alias = "itemNm")]
    pub item_kind: String,
    #[serde(default, alias = "addr", alias = "roadNmAddr")]
    pub address: String,
}

/// Everything the gateways and the rule table produced for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedEvidence {
    pub classification_items: Vec<ClassificationItem>,
    pub collection_points: Vec<CollectionPoint>,
    pub local_rules: Vec<RuleRecord>,
}

impl AggregatedEvidence {
    pub fn is_empty(&self) -> bool {
        self.classification_items.is_empty()
            && self.collection_points.is_empty()
            && self.local_rules.is_empty()
    }

    /// Drop repeated entries, keeping the first occurrence of each.
    pub fn dedup(mut self) -> Self {
        self.classification_items = dedup_in_order(self.classification_items);
        self.collection_points = dedup_in_order(self.collection_points);
        self.local_rules = dedup_in_order(self.local_rules);
        self
    }
}

fn dedup_in_order<T: Clone + Eq + std::hash::Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of a conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, None)
    }

    pub fn assistant(content: impl Into<String>, source_label: Option<String>) -> Self {
        Self::new(Role::Assistant, content, source_label)
    }

    fn new(role: Role, content: impl Into<String>, source_label: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            source_label,
            created_at: Utc::now(),
        }
    }
}

/// Per-weekday description of what may be put out.
///
/// Keys are weekday indexes counted from Sunday (0) to Saturday (6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DischargeSchedule {
    pub days: BTreeMap<u8, String>,
}

impl DischargeSchedule {
    pub fn for_weekday(&self, weekday: Weekday) -> Option<&str> {
        self.days
            .get(&(weekday.num_days_from_sunday() as u8))
            .map(String::as_str)
    }
}

/// A public holiday from the holiday gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    pub is_holiday: bool,
}
