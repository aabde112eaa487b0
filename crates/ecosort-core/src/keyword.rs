//! Keyword extraction from Korean utterances.
//!
//! Turns "깨진 유리컵은 어떻게 버려요?" into the search keyword "유리컵"
//! plus the situational [`Modifier::Broken`].
//!
//! ## Pipeline
//! 1. Strip sentence punctuation
//! 2. Detect the modifier (fixed priority order, first match wins)
//! 3. Strip trailing request phrases ("버리는 법", "어떻게 버려요", ...)
//! 4. Drop filler tokens
//! 5. Priority-ordered particle scan: object > topic > subject/others
//! 6. Fall back to the remaining tokens, then to the cleaned text

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::Modifier;

lazy_static! {
    /// Sentence punctuation removed before anything else.
    static ref PUNCTUATION: Regex = Regex::new(r"[?.!,]").unwrap();
}

/// Modifier triggers in scan order. The first group with a hit wins.
const MODIFIER_TRIGGERS: &[(Modifier, &[&str])] = &[
    (Modifier::Dirty, &["묻은", "더러운", "음식물", "이물질"]),
    (Modifier::Broken, &["깨진", "파손된"]),
    (Modifier::Liquid, &["액체", "남은", "내용물"]),
    (Modifier::Oily, &["기름"]),
];

/// Adjectival trigger forms that describe the item rather than name it.
const MODIFIER_ADJECTIVES: &[&str] = &["묻은", "더러운", "깨진", "파손된", "남은"];

/// Trailing "how do I throw this away" phrases.
const REQUEST_PHRASES: &[&str] = &[
    "어떻게 버려야 하나요",
    "어떻게 버려야 해요",
    "어떻게 버려야 돼요",
    "어떻게 버려야 돼",
    "어떻게 버리나요",
    "어떻게 버려요",
    "어떻게 버려",
    "버리는 방법",
    "버리는 법",
    "버리는법",
    "분리배출 어떻게 해야 돼요",
    "분리배출 어떻게 해요",
    "분리배출 방법",
    "분리배출방법",
    "분리수거 방법",
    "분리수거방법",
    "배출 방법",
    "배출방법",
    "분리배출",
    "분리수거",
    "재활용 되나요",
    "재활용 돼요",
    "재활용 돼",
    "버려도 되나요",
    "버려도 돼요",
    "버리고 싶어요",
    "버리고 싶어",
    "버리는 비용",
    "얼마인가요",
    "얼마예요",
    "얼마야",
    "알려주세요",
    "알려줘",
];

/// Tokens that never name an item.
const FILLER_WORDS: &[&str] = &[
    "어떻게", "버려", "버려요", "버리나요", "방법", "배출", "분리", "분리배출", "분리수거",
    "알려줘", "비용", "수수료", "얼마", "요", "좀",
];

/// Nouns whose last syllable looks like a subject or other marker.
/// Tokens ending in one of these keep that syllable.
const PARTICLE_LIKE_NOUNS: &[&str] = &[
    "종이", "오이", "고양이", "옷걸이", "책꽂이", "재떨이", "손톱깎이", "난로", "포도",
];

const OBJECT_MARKERS: &[&str] = &["을", "를"];
const TOPIC_MARKERS: &[&str] = &["은", "는"];
/// Longer particles first so "으로" is not read as "로".
const OTHER_MARKERS: &[&str] = &["으로", "이", "가", "도", "만", "로"];

/// Keyword and modifier pulled out of an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub keyword: String,
    pub modifier: Modifier,
}

/// Extract the search keyword and situational modifier from `raw`.
///
/// Pure and deterministic. Never returns an empty keyword for non-blank
/// input.
pub fn extract_keyword(raw: &str) -> Extraction {
    let cleaned = PUNCTUATION.replace_all(raw, "").trim().to_string();
    let modifier = detect_modifier(&cleaned);

    let stripped = strip_request_phrases(&cleaned);
    let tokens = drop_filler(stripped.split_whitespace().collect());

    let keyword = scan_particles(&tokens)
        .or_else(|| {
            let joined = tokens
                .iter()
                .filter(|t| !is_bare_particle(t))
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        })
        .unwrap_or_else(|| cleaned.clone());

    Extraction { keyword, modifier }
}

/// Fixed-order modifier scan over the cleaned text.
pub fn detect_modifier(text: &str) -> Modifier {
    MODIFIER_TRIGGERS
        .iter()
        .find(|(_, terms)| terms.iter().any(|term| text.contains(term)))
        .map(|(modifier, _)| *modifier)
        .unwrap_or(Modifier::None)
}

/// Remove trailing request phrases, longest match first, each at most once.
fn strip_request_phrases(text: &str) -> String {
    let mut phrases: Vec<&str> = REQUEST_PHRASES.to_vec();
    phrases.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));

    let mut current = text.trim().to_string();
    let mut used = vec![false; phrases.len()];

    loop {
        let hit = phrases
            .iter()
            .enumerate()
            .find(|(i, phrase)| !used[*i] && current.ends_with(**phrase));

        match hit {
            Some((i, phrase)) => {
                used[i] = true;
                let cut = current.len() - phrase.len();
                current = current[..cut].trim_end().to_string();
            }
            None => break,
        }
    }

    current
}

/// Drop filler and descriptive tokens, keeping at least one token.
fn drop_filler(tokens: Vec<&str>) -> Vec<&str> {
    let kept: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|t| !FILLER_WORDS.contains(t))
        .filter(|t| !MODIFIER_ADJECTIVES.iter().any(|adj| t.ends_with(adj)))
        .collect();

    if kept.is_empty() {
        tokens
    } else {
        kept
    }
}

fn is_bare_particle(token: &str) -> bool {
    OBJECT_MARKERS
        .iter()
        .chain(TOPIC_MARKERS)
        .chain(OTHER_MARKERS)
        .any(|p| token == *p)
}

/// Priority-ordered particle scan.
///
/// Object markers outrank topic markers, which outrank everything else.
/// Within a tier the leftmost token wins.
fn scan_particles(tokens: &[&str]) -> Option<String> {
    for markers in [OBJECT_MARKERS, TOPIC_MARKERS, OTHER_MARKERS] {
        for token in tokens {
            if PARTICLE_LIKE_NOUNS.iter().any(|noun| token.ends_with(noun)) {
                continue;
            }
            for particle in markers {
                if let Some(stem) = strip_particle(token, particle) {
                    return Some(stem);
                }
            }
        }
    }

    None
}

/// The token minus `particle`, when something is left of it.
fn strip_particle(token: &str, particle: &str) -> Option<String> {
    let stem = token.strip_suffix(particle)?;
    (!stem.is_empty()).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keyword(raw: &str) -> String {
        extract_keyword(raw).keyword
    }

    #[test]
    fn test_object_marker_wins_over_subject_marker() {
        assert_eq!(keyword("소파를 버리고싶은데 폐기물스티커가 필요해?"), "소파");
    }

    #[test]
    fn test_request_phrase_stripped_keeps_compound() {
        let extraction = extract_keyword("피자 박스 버리는 법");
        assert_eq!(extraction.keyword, "피자 박스");
        assert_eq!(extraction.modifier, Modifier::None);
    }

    #[test]
    fn test_topic_marker() {
        assert_eq!(keyword("우유팩은 어떻게 버려요?"), "우유팩");
        assert_eq!(keyword("스티로폼은 어떻게 버려?"), "스티로폼");
    }

    #[test]
    fn test_subject_marker() {
        assert_eq!(keyword("비닐봉지가 재활용 되나요?"), "비닐봉지");
    }

    #[test]
    fn test_one_syllable_nouns_lose_their_particle() {
        assert_eq!(keyword("컵이 깨졌어요"), "컵");
        assert_eq!(keyword("캔도 재활용 되나요?"), "캔");
        assert_eq!(keyword("병이 어떻게 버려요"), "병");
    }

    #[test]
    fn test_particle_like_endings_kept() {
        assert_eq!(keyword("종이 어떻게 버려요"), "종이");
        assert_eq!(keyword("옷걸이 버리는 법"), "옷걸이");
        assert_eq!(keyword("전기난로 버리는 방법"), "전기난로");
        assert_eq!(keyword("종이가 젖었어요"), "종이");
    }

    #[test]
    fn test_fee_questions() {
        assert_eq!(keyword("소파 버리는 비용 얼마예요?"), "소파");
        assert_eq!(keyword("장롱 수수료 얼마야"), "장롱");
    }

    #[test]
    fn test_compound_sorting_phrases() {
        assert_eq!(keyword("페트병 분리배출 방법"), "페트병");
        assert_eq!(keyword("우유팩 분리수거 방법 알려줘"), "우유팩");
        assert_eq!(keyword("유리병 분리배출 어떻게 해요?"), "유리병");
    }

    #[test]
    fn test_longer_particle_checked_first() {
        assert_eq!(keyword("음료수병으로"), "음료수병");
    }

    #[test]
    fn test_multiple_request_phrases() {
        assert_eq!(keyword("건전지 버리는 방법 알려줘"), "건전지");
    }

    #[test]
    fn test_modifier_adjective_dropped() {
        let extraction = extract_keyword("음식물 묻은 플라스틱은 재활용 되나요?");
        assert_eq!(extraction.modifier, Modifier::Dirty);
        assert_eq!(extraction.keyword, "플라스틱");
    }

    #[test]
    fn test_bare_particle_token_dropped() {
        assert_eq!(keyword("우유팩 를"), "우유팩");
    }

    #[test]
    fn test_falls_back_to_cleaned_text() {
        assert_eq!(keyword("어떻게 버려요?"), "어떻게 버려요");
    }

    #[test]
    fn test_modifier_priority_order() {
        // Contamination is scanned before oil.
        assert_eq!(detect_modifier("기름 묻은 프라이팬"), Modifier::Dirty);
        assert_eq!(detect_modifier("기름 통"), Modifier::Oily);
        assert_eq!(detect_modifier("깨진 접시"), Modifier::Broken);
        assert_eq!(detect_modifier("내용물 남은 병"), Modifier::Liquid);
        assert_eq!(detect_modifier("유리병"), Modifier::None);
    }

    #[test]
    fn test_every_trigger_maps_to_its_modifier() {
        for (modifier, terms) in MODIFIER_TRIGGERS {
            for term in *terms {
                let extraction = extract_keyword(&format!("{} 병", term));
                assert_eq!(extraction.modifier, *modifier, "trigger {}", term);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_object_marker_stripped_first(
            noun in "[가-힣]{2,5}",
            other in "[가-힣]{2,5}",
        ) {
            // The other token carries a subject marker that must lose.
            let utterance = format!("{}을 {}가", noun, other);
            prop_assert_eq!(keyword(&utterance), noun);
        }

        #[test]
        fn prop_no_trigger_means_no_modifier(text in "[a-z0-9 ]{1,20}") {
            prop_assert_eq!(extract_keyword(&text).modifier, Modifier::None);
        }

        #[test]
        fn prop_keyword_never_empty(text in "[가-힣a-z ]{0,12}[가-힣a-z]") {
            prop_assert!(!extract_keyword(&text).keyword.is_empty());
        }
    }
}
