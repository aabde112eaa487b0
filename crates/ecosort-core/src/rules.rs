//! Local discharge rule table.
//!
//! A static dataset of per-district discharge rules, bundled at compile time
//! or loaded from a file. External files are validated against
//! `data/waste_rules.schema.json` before they are accepted.

use std::path::Path;
use std::sync::OnceLock;

use thiserror::Error;

use crate::types::RuleRecord;

/// Bundled dataset (loaded at compile time).
const BUNDLED_RULES_JSON: &str = include_str!("../data/waste_rules.json");

/// Embedded dataset schema.
const RULES_SCHEMA_JSON: &str = include_str!("../data/waste_rules.schema.json");

/// Compiled schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from loading a rule table.
#[derive(Error, Debug)]
pub enum RuleTableError {
    #[error("Failed to read rule file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid rule JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to load schema: {0}")]
    Schema(String),

    #[error("Rule file does not match schema: {}", .0.join("; "))]
    Validation(Vec<String>),
}

fn get_validator() -> Result<&'static jsonschema::Validator, RuleTableError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema: serde_json::Value = serde_json::from_str(RULES_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;
        jsonschema::options()
            .build(&schema)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| RuleTableError::Schema(e.clone()))
}

/// Validate a rule dataset against the schema, collecting every violation.
pub fn validate_rules_schema(value: &serde_json::Value) -> Result<(), RuleTableError> {
    let validator = get_validator()?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(RuleTableError::Validation(errors))
    }
}

/// In-memory rule table. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    records: Vec<RuleRecord>,
}

impl RuleTable {
    pub fn new(records: Vec<RuleRecord>) -> Self {
        Self { records }
    }

    /// The dataset shipped with the crate.
    pub fn bundled() -> Result<Self, RuleTableError> {
        Self::from_json_str(BUNDLED_RULES_JSON)
    }

    /// Load and validate a dataset file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RuleTableError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, RuleTableError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        validate_rules_schema(&value)?;
        let records: Vec<RuleRecord> = serde_json::from_value(value)?;
        tracing::debug!(records = records.len(), "Loaded rule table");
        Ok(Self { records })
    }

    /// Records whose province and district contain the given parts.
    ///
    /// Returns nothing when either part is empty.
    pub fn filter(&self, sido: &str, sigungu: &str) -> Vec<RuleRecord> {
        let (sido, sigungu) = (sido.trim(), sigungu.trim());
        if sido.is_empty() || sigungu.is_empty() {
            return Vec::new();
        }

        self.records
            .iter()
            .filter(|rule| rule.matches(sido, sigungu))
            .cloned()
            .collect()
    }

    pub fn records(&self) -> &[RuleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_table_loads() {
        let table = RuleTable::bundled().unwrap();
        assert!(!table.is_empty());
    }

    #[test]
    fn test_filter_by_containment() {
        let table = RuleTable::bundled().unwrap();
        let rules = table.filter("서울", "종로");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].sigungu, "종로구");

        // Two management areas in one district
        assert_eq!(table.filter("부산광역시", "해운대구").len(), 2);
    }

    #[test]
    fn test_filter_requires_both_parts() {
        let table = RuleTable::bundled().unwrap();
        assert!(table.filter("서울특별시", "").is_empty());
        assert!(table.filter("", "종로구").is_empty());
        assert!(table.filter("  ", "종로구").is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let table = RuleTable::bundled().unwrap();
        let first = table.filter("서울특별시", "마포구");
        let second = RuleTable::new(first.clone()).filter("서울특별시", "마포구");
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_path_validates_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"sido": "서울특별시", "sigungu": 3}}]"#).unwrap();

        let err = RuleTable::from_path(file.path()).unwrap_err();
        assert!(matches!(err, RuleTableError::Validation(_)));
    }

    #[test]
    fn test_from_path_reads_dataset_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"sido": "대전광역시", "sigungu": "유성구", "recycleDschrgDay": "화,금"}}]"#
        )
        .unwrap();

        let table = RuleTable::from_path(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.filter("대전", "유성")[0].recycle_day, "화,금");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RuleTable::from_path("/nonexistent/waste_rules.json").unwrap_err();
        assert!(matches!(err, RuleTableError::Io(_)));
    }
}
