use regex::Regex;
use std::sync::LazyLock;

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\S+").expect("valid mention regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://\S+|www\.\S+").expect("valid url regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Strip substrings that confuse language detection (mentions and URLs).
///
/// Whitespace runs are collapsed and the result trimmed. If nothing would be
/// left, the original text is returned unchanged so detection always has
/// some input.
pub fn sanitize(text: &str) -> String {
    let without_urls = URL_RE.replace_all(text, " ");
    let without_mentions = MENTION_RE.replace_all(&without_urls, " ");
    let cleaned = WHITESPACE_RE
        .replace_all(&without_mentions, " ")
        .trim()
        .to_string();

    if cleaned.is_empty() {
        text.to_string()
    } else {
        cleaned
    }
}
