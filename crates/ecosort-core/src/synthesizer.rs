//! Deterministic answer templates.
//!
//! Turns aggregated evidence into the reply shown when no generated text is
//! available. Output is a pure function of the query, the evidence and an
//! explicit seed that picks the intro line.

use serde::{Deserialize, Serialize};

use crate::josa::attach_josa;
use crate::types::{AggregatedEvidence, ClassificationItem, Modifier, Query};

/// Friendly first lines. One is picked per answer by seed.
pub const INTROS: [&str; 3] = [
    "제가 찾아봤어요! 🧐",
    "관련된 정보를 찾았어요! 🌱",
    "이렇게 배출하면 돼요! 💡",
];

pub const CLOSING: &str = "지구를 지키는 당신, 정말 멋져요! 🌍";

/// Shown when the item lookup found nothing but other sources answered.
pub const NOT_FOUND_MESSAGE: &str =
    "해당 품목의 배출 정보를 찾지 못했어요. 😥 다른 이름으로 다시 검색해 주세요.";

/// Shown when no source and no generator produced anything.
pub const APOLOGY_MESSAGE: &str =
    "죄송해요, 지금은 배출 정보를 불러올 수 없어요. 잠시 후 다시 시도해 주세요. 🙏";

/// Source attribution for item answers.
pub const CLASSIFICATION_SOURCE: &str = "기후에너지환경부";

/// Source attribution for generated answers.
pub const GENERATED_SOURCE: &str = "Google Gemini";

/// How an answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Free text from the generative provider
    Generated,
    /// Templated lines over classification items
    Items,
    NotFound,
    Apology,
}

/// A finished reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub kind: AnswerKind,
    pub message: String,
    /// Items the message was built from (empty for generated answers)
    pub items: Vec<ClassificationItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_label: Option<String>,
}

impl Answer {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            kind: AnswerKind::Generated,
            message: text.into(),
            items: Vec::new(),
            source_label: Some(GENERATED_SOURCE.to_string()),
        }
    }

    pub fn apology() -> Self {
        Self {
            kind: AnswerKind::Apology,
            message: APOLOGY_MESSAGE.to_string(),
            items: Vec::new(),
            source_label: None,
        }
    }
}

/// Intro line for a seed.
pub fn pick_intro(seed: u64) -> &'static str {
    INTROS[(seed % INTROS.len() as u64) as usize]
}

/// Fixed advisory block for a modifier.
pub fn advisory(modifier: Modifier) -> Option<&'static str> {
    match modifier {
        Modifier::None => None,
        Modifier::Dirty => Some(
            "⚠️ 이물질이 묻어 있다면 깨끗한 물로 헹군 뒤 배출해주세요. \
             씻어도 지워지지 않으면 일반쓰레기로 버려야 해요.",
        ),
        Modifier::Broken => Some(
            "⚠️ 깨진 조각은 신문지 등으로 감싸 일반쓰레기(종량제봉투)로 배출해주세요. \
             양이 많으면 불연성 마대를 이용하세요.",
        ),
        Modifier::Liquid => Some("⚠️ 내용물은 깨끗이 비우고 물로 헹군 뒤 재활용품으로 배출해주세요."),
        Modifier::Oily => Some(
            "⚠️ 기름은 씻어도 잘 지워지지 않아요. \
             완전히 세척되지 않으면 일반쓰레기로 배출해주세요.",
        ),
    }
}

/// One disposal line: "피자박스는 종이류 배출(으)로 배출해주세요."
pub fn item_line(item: &ClassificationItem) -> String {
    format!(
        "{} {}(으)로 배출해주세요.",
        attach_josa(item.item_name.trim(), "은/는"),
        item.discharge_method.trim()
    )
}

/// Template renderer for the fallback path.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer;

impl Synthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Render a reply from evidence alone.
    ///
    /// Classification items win. With none, other evidence yields the
    /// not-found message and no evidence at all yields the apology.
    pub fn render(&self, query: &Query, evidence: &AggregatedEvidence, seed: u64) -> Answer {
        if evidence.classification_items.is_empty() {
            if evidence.is_empty() {
                return Answer::apology();
            }
            return Answer {
                kind: AnswerKind::NotFound,
                message: NOT_FOUND_MESSAGE.to_string(),
                items: Vec::new(),
                source_label: None,
            };
        }

        let mut blocks = Vec::new();
        if let Some(advice) = advisory(query.modifier) {
            blocks.push(advice.to_string());
        }

        let mut body = vec![pick_intro(seed).to_string()];
        body.extend(evidence.classification_items.iter().map(item_line));
        blocks.push(body.join("\n"));
        blocks.push(CLOSING.to_string());

        Answer {
            kind: AnswerKind::Items,
            message: blocks.join("\n\n"),
            items: evidence.classification_items.clone(),
            source_label: Some(CLASSIFICATION_SOURCE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CollectionPoint, RuleRecord};

    fn evidence_with(items: Vec<ClassificationItem>) -> AggregatedEvidence {
        AggregatedEvidence {
            classification_items: items,
            ..Default::default()
        }
    }

    #[test]
    fn test_pizza_box_end_to_end() {
        let query = Query::build("피자 박스 버리는 법", None);
        assert_eq!(query.keyword, "피자 박스");
        assert_eq!(query.modifier, Modifier::None);

        let evidence = evidence_with(vec![ClassificationItem::new("피자박스", "종이류 배출")]);
        let answer = Synthesizer::new().render(&query, &evidence, 0);

        assert_eq!(answer.kind, AnswerKind::Items);
        assert!(answer
            .message
            .contains("피자박스는 종이류 배출(으)로 배출해주세요."));
        assert!(answer.message.starts_with(INTROS[0]));
        assert!(answer.message.ends_with(CLOSING));
        assert_eq!(answer.source_label.as_deref(), Some(CLASSIFICATION_SOURCE));
    }

    #[test]
    fn test_intro_is_a_function_of_seed() {
        assert_eq!(pick_intro(0), INTROS[0]);
        assert_eq!(pick_intro(4), INTROS[1]);
        assert_eq!(pick_intro(u64::MAX), INTROS[(u64::MAX % 3) as usize]);
    }

    #[test]
    fn test_modifier_advisory_comes_first() {
        let query = Query::build("기름 통 어떻게 버려요", None);
        assert_eq!(query.modifier, Modifier::Oily);

        let evidence = evidence_with(vec![ClassificationItem::new("식용유통", "플라스틱류")]);
        let answer = Synthesizer::new().render(&query, &evidence, 1);
        assert!(answer.message.starts_with("⚠️ 기름은"));
        assert!(answer.message.contains(INTROS[1]));
    }

    #[test]
    fn test_item_line_particles() {
        assert_eq!(
            item_line(&ClassificationItem::new("스티로폼", "발포합성수지")),
            "스티로폼은 발포합성수지(으)로 배출해주세요."
        );
        assert_eq!(
            item_line(&ClassificationItem::new("종이", "종이류")),
            "종이는 종이류(으)로 배출해주세요."
        );
        assert_eq!(
            item_line(&ClassificationItem::new("페트병", "투명 페트병")),
            "페트병은 투명 페트병(으)로 배출해주세요."
        );
    }

    #[test]
    fn test_not_found_when_only_other_evidence() {
        let query = Query::build("소파를 버리고 싶어", None);
        let evidence = AggregatedEvidence {
            local_rules: vec![RuleRecord::default()],
            collection_points: vec![CollectionPoint {
                business_name: "그린자원".into(),
                item_kind: "대형폐기물".into(),
                address: "서울특별시 종로구".into(),
            }],
            ..Default::default()
        };
        let answer = Synthesizer::new().render(&query, &evidence, 7);
        assert_eq!(answer.kind, AnswerKind::NotFound);
        assert_eq!(answer.message, NOT_FOUND_MESSAGE);
    }

    #[test]
    fn test_apology_when_nothing_found() {
        let query = Query::build("우주선 어떻게 버려요", None);
        let answer = Synthesizer::new().render(&query, &AggregatedEvidence::default(), 3);
        assert_eq!(answer, Answer::apology());
        assert_eq!(answer.message, APOLOGY_MESSAGE);
    }

    #[test]
    fn test_every_modifier_but_none_has_advisory() {
        for modifier in [Modifier::Dirty, Modifier::Broken, Modifier::Liquid, Modifier::Oily] {
            assert!(advisory(modifier).is_some());
        }
        assert!(advisory(Modifier::None).is_none());
    }
}
