//! Turn a translations map into LINE reply messages.
//!
//! Short translations are shown together in one Flex bubble. As soon as one
//! translation is longer than `short_threshold`, every language gets its own
//! labeled text message instead, split into numbered chunks when needed.

use crate::i18n::{LanguageCode, Translations};
use crate::line::{FlexComponent, FlexContainer, OutboundMessage};
use thiserror::Error;
use tracing::warn;

pub const APOLOGY_TEXT: &str = "翻訳に失敗しました。もう一度お試しください。";
pub const FLEX_TITLE: &str = "🌍 Translation";
pub const ALT_TEXT_PREFIX: &str = "多言語翻訳結果";

const ELLIPSIS: char = '…';
const SENTENCE_TERMINALS: [char; 7] = ['。', '！', '？', '.', '!', '?', '\n'];

/// Transport limits. All lengths are in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyLimits {
    /// Longest translation still rendered in the Flex bubble
    pub short_threshold: usize,
    pub section_max_chars: usize,
    pub alt_text_max_chars: usize,
    /// Text budget of one plain message; the label prefix fits in the
    /// transport's remaining margin
    pub chunk_chars: usize,
    /// Messages accepted by one reply call
    pub max_messages: usize,
    /// Language sections in one Flex bubble
    pub max_sections: usize,
}

impl Default for ReplyLimits {
    fn default() -> Self {
        Self {
            short_threshold: 300,
            section_max_chars: 1000,
            alt_text_max_chars: 400,
            chunk_chars: 4800,
            max_messages: 5,
            max_sections: 10,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlexError {
    #[error("nothing to show")]
    Empty,
    #[error("{count} sections exceed the bubble limit of {max}")]
    TooManySections { count: usize, max: usize },
}

/// Cut `text` to at most `max` characters, marking the cut with `…`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let mut truncated: String = text.chars().take(max - 1).collect();
    truncated.push(ELLIPSIS);
    truncated
}

/// Split `text` at sentence boundaries into chunks of at most `limit` chars.
///
/// A run of terminals (`。！？.!?` or newline) stays with the sentence it
/// ends. Sentences are packed greedily; a sentence longer than `limit` is
/// sliced at fixed length. Concatenating the chunks gives back `text`.
pub fn split_into_chunks(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);

    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences(text) {
        let sentence_len = sentence.chars().count();

        if current_len + sentence_len <= limit {
            current.push_str(sentence);
            current_len += sentence_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if sentence_len <= limit {
            current.push_str(sentence);
            current_len = sentence_len;
            continue;
        }

        // Hard slicing; the tail stays open for the following sentences
        let chars: Vec<char> = sentence.chars().collect();
        let mut pieces = chars.chunks(limit).peekable();
        while let Some(piece) = pieces.next() {
            if pieces.peek().is_some() {
                chunks.push(piece.iter().collect());
            } else {
                current = piece.iter().collect();
                current_len = piece.len();
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut in_terminal_run = false;

    for (idx, ch) in text.char_indices() {
        let is_terminal = SENTENCE_TERMINALS.contains(&ch);
        if in_terminal_run && !is_terminal {
            sentences.push(&text[start..idx]);
            start = idx;
        }
        in_terminal_run = is_terminal;
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

fn flattened_summary(translations: &Translations) -> String {
    translations
        .iter()
        .map(|(lang, text)| {
            let one_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("{} {}", lang.label(), one_line)
        })
        .collect::<Vec<_>>()
        .join(" / ")
}

fn alt_text(translations: &Translations, limits: &ReplyLimits) -> String {
    truncate_chars(
        &format!("{}: {}", ALT_TEXT_PREFIX, flattened_summary(translations)),
        limits.alt_text_max_chars,
    )
}

/// One Flex bubble: title, then separator + label + text per language.
pub fn build_flex_message(
    translations: &Translations,
    limits: &ReplyLimits,
) -> Result<OutboundMessage, FlexError> {
    if translations.is_empty() {
        return Err(FlexError::Empty);
    }
    if translations.len() > limits.max_sections {
        return Err(FlexError::TooManySections {
            count: translations.len(),
            max: limits.max_sections,
        });
    }

    let mut contents = vec![FlexComponent::Text {
        text: FLEX_TITLE.to_string(),
        weight: Some("bold"),
        size: Some("lg"),
        color: Some("#1DB446"),
        margin: None,
        wrap: None,
    }];

    for (lang, text) in translations {
        contents.push(FlexComponent::Separator { margin: "md" });
        contents.push(FlexComponent::Text {
            text: lang.label().to_string(),
            weight: Some("bold"),
            size: Some("xs"),
            color: Some("#666666"),
            margin: Some("md"),
            wrap: None,
        });
        contents.push(FlexComponent::Text {
            text: truncate_chars(text, limits.section_max_chars),
            weight: None,
            size: Some("md"),
            color: None,
            margin: Some("sm"),
            wrap: Some(true),
        });
    }

    Ok(OutboundMessage::Flex {
        alt_text: alt_text(translations, limits),
        contents: FlexContainer::Bubble {
            body: FlexComponent::Box {
                layout: "vertical",
                contents,
            },
        },
    })
}

/// Plain-text rendering of the bubble, used when it cannot be built.
pub fn build_flattened_message(translations: &Translations, limits: &ReplyLimits) -> OutboundMessage {
    let mut text = FLEX_TITLE.to_string();
    for (lang, translated) in translations {
        text.push_str(&format!(
            "\n\n{}\n{}",
            lang.label(),
            truncate_chars(translated, limits.section_max_chars)
        ));
    }

    OutboundMessage::text(truncate_chars(&text, limits.chunk_chars))
}

fn labeled_messages(lang: LanguageCode, text: &str, limits: &ReplyLimits) -> Vec<OutboundMessage> {
    let label = lang.label();
    let whole = format!("{}: {}", label, text);
    if whole.chars().count() <= limits.chunk_chars {
        return vec![OutboundMessage::text(whole)];
    }

    let chunks = split_into_chunks(text, limits.chunk_chars);
    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| OutboundMessage::text(format!("{} ({}/{}): {}", label, i + 1, total, chunk)))
        .collect()
}

/// Build the reply for a translation result.
///
/// Empty translations produce the apology. The result never holds more
/// than `max_messages` messages; anything beyond is dropped and logged.
pub fn format_reply(translations: &Translations, limits: &ReplyLimits) -> Vec<OutboundMessage> {
    if translations.is_empty() {
        return vec![OutboundMessage::text(APOLOGY_TEXT)];
    }

    let all_short = translations
        .values()
        .all(|text| text.chars().count() <= limits.short_threshold);

    if all_short {
        return match build_flex_message(translations, limits) {
            Ok(message) => vec![message],
            Err(e) => {
                warn!("Flex message construction failed ({}), sending plain text", e);
                vec![build_flattened_message(translations, limits)]
            }
        };
    }

    let mut messages: Vec<OutboundMessage> = translations
        .iter()
        .flat_map(|(lang, text)| labeled_messages(*lang, text, limits))
        .collect();

    if messages.len() > limits.max_messages {
        warn!(
            "Reply needs {} messages but only {} fit; dropping {}",
            messages.len(),
            limits.max_messages,
            messages.len() - limits.max_messages
        );
        messages.truncate(limits.max_messages);
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn translations(pairs: &[(LanguageCode, &str)]) -> Translations {
        pairs.iter().map(|(l, t)| (*l, t.to_string())).collect()
    }

    fn text_of(message: &OutboundMessage) -> &str {
        match message {
            OutboundMessage::Text { text } => text,
            OutboundMessage::Flex { .. } => panic!("expected a text message"),
        }
    }

    // ==================== Truncation Tests ====================

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hell…");
        assert_eq!(truncate_chars("こんにちは世界", 3), "こん…");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    // ==================== Chunking Tests ====================

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_into_chunks("Hello. World.", 100), vec!["Hello. World."]);
        assert!(split_into_chunks("", 100).is_empty());
    }

    #[test]
    fn test_chunks_break_at_sentences() {
        let chunks = split_into_chunks("First one. Second one. Third one.", 24);
        assert_eq!(chunks, vec!["First one. Second one.", " Third one."]);
    }

    #[test]
    fn test_terminal_runs_stay_together() {
        let chunks = split_into_chunks("本当？！はい。", 5);
        assert_eq!(chunks, vec!["本当？！", "はい。"]);
    }

    #[test]
    fn test_newline_is_a_boundary() {
        let chunks = split_into_chunks("line one\nline two\n", 10);
        assert_eq!(chunks, vec!["line one\n", "line two\n"]);
    }

    #[test]
    fn test_long_sentence_is_sliced() {
        let chunks = split_into_chunks(&"a".repeat(25), 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], "aaaaa");
    }

    #[test]
    fn test_sliced_tail_packs_with_next_sentence() {
        let chunks = split_into_chunks("aaaaaaaaaaaa. bb.", 10);
        assert_eq!(chunks, vec!["aaaaaaaaaa", "aa. bb."]);
    }

    #[test]
    fn test_3000_chars_at_1500_is_two_chunks() {
        let text = "字".repeat(3000);
        let chunks = split_into_chunks(&text, 1500);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.chars().count() == 1500));
    }

    proptest! {
        #[test]
        fn prop_chunks_within_limit_and_reconstruct(
            text in "[a-zA-Zあ-ん 。！？.!?\n]{0,400}",
            limit in 1usize..80,
        ) {
            let chunks = split_into_chunks(&text, limit);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= limit);
                prop_assert!(!chunk.is_empty());
            }
            prop_assert_eq!(chunks.concat(), text);
        }

        #[test]
        fn prop_chunk_count_without_boundaries(
            text in "[a-z가-힣]{1,500}",
            limit in 1usize..100,
        ) {
            let chunks = split_into_chunks(&text, limit);
            let len = text.chars().count();
            prop_assert_eq!(chunks.len(), len.div_ceil(limit));
        }
    }

    // ==================== Reply Tests ====================

    #[test]
    fn test_empty_translations_yield_apology() {
        let messages = format_reply(&Translations::new(), &ReplyLimits::default());
        assert_eq!(messages, vec![OutboundMessage::text(APOLOGY_TEXT)]);
    }

    #[test]
    fn test_short_translations_use_flex() {
        let map = translations(&[
            (LanguageCode::En, "Hello"),
            (LanguageCode::Ko, "안녕하세요"),
            (LanguageCode::ZhTw, "你好"),
        ]);
        let messages = format_reply(&map, &ReplyLimits::default());
        assert_eq!(messages.len(), 1);

        let json = serde_json::to_value(&messages[0]).unwrap();
        assert_eq!(json["type"], "flex");
        assert_eq!(
            json["altText"],
            "多言語翻訳結果: 🇰🇷 한국어 안녕하세요 / 🇹🇼 中文 你好 / 🇺🇸 English Hello"
        );

        let body = &json["contents"]["body"]["contents"];
        assert_eq!(body[0]["text"], FLEX_TITLE);
        // title + 3 × (separator, label, text)
        assert_eq!(body.as_array().unwrap().len(), 10);
        assert_eq!(body[2]["text"], "🇰🇷 한국어");
        assert_eq!(body[3]["text"], "안녕하세요");
        assert_eq!(body[9]["text"], "Hello");
    }

    #[test]
    fn test_alt_text_is_truncated() {
        let long = "x".repeat(300);
        let map = translations(&[(LanguageCode::Ja, &long), (LanguageCode::En, &long)]);
        let limits = ReplyLimits::default();

        let OutboundMessage::Flex { alt_text, .. } = build_flex_message(&map, &limits).unwrap() else {
            panic!("expected flex");
        };
        assert_eq!(alt_text.chars().count(), limits.alt_text_max_chars);
        assert!(alt_text.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_flex_failure_falls_back_to_flattened_text() {
        let map = translations(&[
            (LanguageCode::Ja, "やあ"),
            (LanguageCode::Ko, "안녕"),
            (LanguageCode::En, "Hi"),
        ]);
        let limits = ReplyLimits {
            max_sections: 2,
            ..ReplyLimits::default()
        };

        assert_eq!(
            build_flex_message(&map, &limits),
            Err(FlexError::TooManySections { count: 3, max: 2 })
        );

        let messages = format_reply(&map, &limits);
        assert_eq!(messages.len(), 1);
        assert_eq!(
            text_of(&messages[0]),
            "🌍 Translation\n\n🇯🇵 日本語\nやあ\n\n🇰🇷 한국어\n안녕\n\n🇺🇸 English\nHi"
        );
    }

    #[test]
    fn test_long_translation_switches_to_text_messages() {
        let long = "a".repeat(301);
        let map = translations(&[(LanguageCode::Ja, "短い"), (LanguageCode::En, &long)]);
        let messages = format_reply(&map, &ReplyLimits::default());

        assert_eq!(messages.len(), 2);
        assert_eq!(text_of(&messages[0]), "🇯🇵 日本語: 短い");
        assert_eq!(text_of(&messages[1]), format!("🇺🇸 English: {}", long));
    }

    #[test]
    fn test_long_translation_is_chunked_with_labels() {
        let long = "字".repeat(3000);
        let map = translations(&[(LanguageCode::ZhTw, &long), (LanguageCode::En, "Hi")]);
        let limits = ReplyLimits {
            chunk_chars: 1500,
            ..ReplyLimits::default()
        };

        let messages = format_reply(&map, &limits);

        assert_eq!(messages.len(), 3);
        assert!(text_of(&messages[0]).starts_with("🇹🇼 中文 (1/2): 字"));
        assert!(text_of(&messages[1]).starts_with("🇹🇼 中文 (2/2): 字"));
        assert_eq!(text_of(&messages[2]), "🇺🇸 English: Hi");
    }

    #[test]
    fn test_messages_are_capped() {
        let long = "b".repeat(1000);
        let map = translations(&[(LanguageCode::Ja, &long), (LanguageCode::En, &long)]);
        let limits = ReplyLimits {
            chunk_chars: 300,
            max_messages: 5,
            ..ReplyLimits::default()
        };

        let messages = format_reply(&map, &limits);

        // 4 chunks per language, only the first 5 messages survive
        assert_eq!(messages.len(), 5);
        assert!(text_of(&messages[3]).starts_with("🇯🇵 日本語 (4/4): "));
        assert!(text_of(&messages[4]).starts_with("🇺🇸 English (1/4): "));
    }

    #[test]
    fn test_flex_sections_are_truncated() {
        let map = translations(&[(LanguageCode::En, "abcdefghij")]);
        let limits = ReplyLimits {
            section_max_chars: 5,
            ..ReplyLimits::default()
        };

        let json = serde_json::to_value(build_flex_message(&map, &limits).unwrap()).unwrap();
        assert_eq!(json["contents"]["body"]["contents"][3]["text"], "abcd…");
    }
}
