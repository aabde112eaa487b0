//! Korean particle selection.
//!
//! Whether a particle takes its post-consonant or post-vowel form depends on
//! the final consonant (batchim) of the preceding syllable.

const HANGUL_FIRST: u32 = 0xAC00;
const HANGUL_LAST: u32 = 0xD7A3;
/// Number of possible final consonants, including "none".
const FINAL_CONSONANTS: u32 = 28;

/// Pick the particle form that follows `word`.
///
/// `label` is an "A/B" pair with the post-consonant form first, e.g.
/// "은/는", "이/가" or "을/를". Trailing non-Hangul characters are skipped.
/// When `word` holds no Hangul syllable at all the label comes back
/// unchanged so the caller still renders something readable.
pub fn get_josa(word: &str, label: &str) -> String {
    let Some((with_final, without_final)) = label.split_once('/') else {
        return label.to_string();
    };

    let last_syllable = word
        .chars()
        .rev()
        .map(|c| c as u32)
        .find(|code| (HANGUL_FIRST..=HANGUL_LAST).contains(code));

    match last_syllable {
        Some(code) if (code - HANGUL_FIRST) % FINAL_CONSONANTS > 0 => with_final.to_string(),
        Some(_) => without_final.to_string(),
        None => label.to_string(),
    }
}

/// `word` followed by the matching particle from `label`.
pub fn attach_josa(word: &str, label: &str) -> String {
    format!("{}{}", word, get_josa(word, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_topic_particle() {
        assert_eq!(get_josa("사과", "은/는"), "는");
        assert_eq!(get_josa("책상", "은/는"), "은");
    }

    #[test]
    fn test_no_hangul_returns_label() {
        assert_eq!(get_josa("123", "은/는"), "은/는");
        assert_eq!(get_josa("", "이/가"), "이/가");
    }

    #[test]
    fn test_skips_trailing_non_hangul() {
        assert_eq!(get_josa("페트병(PET)", "을/를"), "을");
        assert_eq!(get_josa("우유 1L", "이/가"), "가");
    }

    #[test]
    fn test_other_labels() {
        assert_eq!(get_josa("캔", "이/가"), "이");
        assert_eq!(get_josa("유리", "을/를"), "를");
    }

    #[test]
    fn test_attach() {
        assert_eq!(attach_josa("피자박스", "은/는"), "피자박스는");
        assert_eq!(attach_josa("스티로폼", "은/는"), "스티로폼은");
    }

    proptest! {
        #[test]
        fn prop_hangul_word_gets_one_form(word in "[가-힣]{1,6}") {
            let josa = get_josa(&word, "은/는");
            prop_assert!(josa == "은" || josa == "는");
        }

        #[test]
        fn prop_ascii_word_keeps_label(word in "[a-zA-Z0-9 ]{0,10}") {
            prop_assert_eq!(get_josa(&word, "을/를"), "을/를");
        }
    }
}
