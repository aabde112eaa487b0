//! Prompts for the generative provider.
//!
//! The chat prompt embeds the aggregated evidence so the model answers from
//! public data first. Both prompts ask for plain text since the client
//! renders replies verbatim.

use ecosort_core::{AggregatedEvidence, Modifier, Query, WasteCategory};

/// Placeholder for an evidence block with nothing in it.
pub const NO_DATA: &str = "(관련 데이터 없음)";

const PERSONA: &str = "당신은 친절한 환경 마스코트 '에코'입니다. \
한국의 분리배출 규정을 잘 알고 있고, 사용자의 질문에 따뜻한 반말 섞인 존댓말로 답합니다.";

const CHAT_INSTRUCTIONS: &str = "[지시사항]
1. 아래 공공데이터를 일반 상식보다 우선해서 근거로 사용하세요.
2. 공공데이터가 없다면 추측임을 밝히고, 확실하지 않은 부분은 지자체에 확인하라고 안내하세요.
3. 세척, 분리 등 구체적인 배출 단계를 알려주세요.
4. 재활용이 가능한지 불가능한지(종량제 등) 명확히 말해주세요.
5. 마크다운(*, #, 표 등)을 쓰지 말고 이모지를 곁들인 일반 문장으로 짧게 답하세요.";

/// Extra instruction per detected modifier.
fn modifier_instruction(modifier: Modifier) -> Option<&'static str> {
    match modifier {
        Modifier::None => None,
        Modifier::Dirty => Some("사용자의 물건은 오염되어 있어요. 헹궈서 지워지지 않는 오염은 일반쓰레기라고 알려주세요."),
        Modifier::Broken => Some("사용자의 물건은 깨져 있어요. 다치지 않게 감싸서 버리는 방법을 먼저 알려주세요."),
        Modifier::Liquid => Some("물건에 내용물이 남아 있어요. 내용물을 비우고 헹구는 방법을 먼저 알려주세요."),
        Modifier::Oily => Some("물건에 기름이 묻어 있어요. 기름은 씻어도 잘 지워지지 않는 경우가 많아 일반쓰레기로 버려야 할 수 있다고 알려주세요."),
    }
}

/// Prompt for a text question.
pub fn chat_prompt(query: &Query, evidence: &AggregatedEvidence) -> String {
    let classification = bullets(evidence.classification_items.iter().map(|item| {
        match item.contents.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(contents) => format!("{}: {} ({})", item.item_name, item.discharge_method, contents),
            None => format!("{}: {}", item.item_name, item.discharge_method),
        }
    }));

    let points = bullets(evidence.collection_points.iter().map(|point| {
        let mut line = format!("{} ({})", point.business_name, point.item_kind);
        if !point.address.is_empty() {
            line.push_str(&format!(" - {}", point.address));
        }
        line
    }));

    let rules = bullets(evidence.local_rules.iter().map(|rule| {
        let days = WasteCategory::ALL
            .iter()
            .filter(|category| !rule.day_field(**category).is_empty())
            .map(|category| format!("{} {}", category.label(), rule.day_field(*category)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut line = format!("{} {}", rule.sido, rule.sigungu);
        if !rule.emd_name.is_empty() {
            line.push_str(&format!(" {}", rule.emd_name));
        }
        if !days.is_empty() {
            line.push_str(&format!(": {}", days));
        }
        if !rule.discharge_place.is_empty() {
            line.push_str(&format!(" (배출장소: {})", rule.discharge_place));
        }
        line
    }));

    let mut prompt = format!(
        "{persona}\n\n사용자 질문: {question}\n사용자 위치: {location}\n\n\
         [품목별 배출 방법]\n{classification}\n\n\
         [주변 수거 업체]\n{points}\n\n\
         [지역 배출 규정]\n{rules}\n\n{instructions}",
        persona = PERSONA,
        question = query.raw_text,
        location = query.location_text(),
        classification = classification,
        points = points,
        rules = rules,
        instructions = CHAT_INSTRUCTIONS,
    );

    if let Some(extra) = modifier_instruction(query.modifier) {
        prompt.push_str("\n6. ");
        prompt.push_str(extra);
    }

    prompt
}

/// Prompt sent alongside a photo.
pub fn vision_prompt(location: Option<&str>) -> String {
    let location = location
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("알 수 없음");

    format!(
        "{persona}\n사용자가 방금 업로드한 쓰레기 사진을 보고 올바른 분리배출 방법을 알려줘야 합니다.\n\n\
         사용자 위치: {location}\n\n\
         [지시사항]\n\
         1. 사진 속 물건이 무엇인지 파악하고 이름을 언급해주세요. (예: \"이건 배달 떡볶이 용기네요!\")\n\
         2. 세척, 분리 등 구체적인 단계를 포함해 버리는 방법을 설명해주세요.\n\
         3. 재활용이 가능한지 불가능한지(종량제 등) 명확히 알려주세요.\n\
         4. 말투는 친절하게, 이모지를 사용하고 마크다운은 쓰지 마세요.\n\
         5. 사진이 쓰레기와 관련이 없다면 정중하게 다시 질문해달라고 하세요.\n\n\
         짧고 명확하게 답변해주세요.",
        persona = PERSONA,
        location = location,
    )
}

fn bullets<I>(lines: I) -> String
where
    I: Iterator<Item = String>,
{
    let rendered: Vec<String> = lines.map(|line| format!("- {}", line)).collect();
    if rendered.is_empty() {
        NO_DATA.to_string()
    } else {
        rendered.join("\n")
    }
}
