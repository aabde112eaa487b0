//! # ecosort-core
//!
//! Deterministic query resolution for the Ecosort waste-sorting assistant.
//!
//! Everything in this crate is synchronous and free of network access:
//! - keyword and modifier extraction from Korean utterances
//! - the local discharge rule table and weekly schedule derivation
//! - the large-waste fee table and per-region summaries
//! - particle selection and templated answers
//! - the append-only conversation log
//!
//! ## Example
//!
//! ```rust
//! use ecosort_core::{AggregatedEvidence, ClassificationItem, Query, Synthesizer};
//!
//! let query = Query::build("피자 박스 버리는 법", None);
//! assert_eq!(query.keyword, "피자 박스");
//!
//! let evidence = AggregatedEvidence {
//!     classification_items: vec![ClassificationItem::new("피자박스", "종이류 배출")],
//!     ..Default::default()
//! };
//! let answer = Synthesizer::new().render(&query, &evidence, 0);
//! assert!(answer.message.contains("피자박스는 종이류 배출(으)로 배출해주세요."));
//! ```

pub mod conversation;
pub mod fees;
pub mod josa;
pub mod keyword;
pub mod region;
pub mod rules;
pub mod schedule;
pub mod synthesizer;
pub mod types;

// Re-export main types at crate root
pub use conversation::Conversation;
pub use fees::{format_won, FeeRecord, FeeTable, FeeTableError};
pub use josa::{attach_josa, get_josa};
pub use keyword::{detect_modifier, extract_keyword, Extraction};
pub use region::{
    collection_alert, AlertStatus, CollectionAlert, LargeWasteSummary, RegionSummary,
    StreamSummary,
};
pub use rules::{RuleTable, RuleTableError};
pub use schedule::{derive_schedule, NO_COLLECTION, WEEKDAYS};
pub use synthesizer::{
    Answer, AnswerKind, Synthesizer, APOLOGY_MESSAGE, INTROS, NOT_FOUND_MESSAGE,
};
pub use types::{
    AggregatedEvidence, ClassificationItem, CollectionPoint, DischargeSchedule, Holiday,
    LocationDescriptor, Message, Modifier, Query, Role, RuleRecord, WasteCategory,
};

use thiserror::Error;

/// Errors surfaced by the core crate.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Rule table error: {0}")]
    RuleTable(#[from] RuleTableError),

    #[error("Fee table error: {0}")]
    FeeTable(#[from] FeeTableError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Resolve a raw utterance into a [`Query`], rejecting blank input.
pub fn resolve_query(
    raw: &str,
    location: Option<LocationDescriptor>,
) -> Result<Query, CoreError> {
    if raw.trim().is_empty() {
        return Err(CoreError::InvalidInput("query is empty".to_string()));
    }
    Ok(Query::build(raw, location))
}
