//! Tolerant parsing of model output.
//!
//! Models are asked for bare JSON but regularly wrap it in Markdown code
//! fences or surround it with chatter. Parsing is attempted on the fence-
//! stripped text first, then on each balanced `{...}` object found in it.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\s*```\s*$").expect("valid fence regex")
});

/// Raw `(tag, text)` pairs in the order the provider listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTranslations(pub Vec<(String, String)>);

impl RawTranslations {
    /// Keep the string entries of a JSON object, in document order.
    ///
    /// `null`, numbers and nested values are skipped instead of failing
    /// the whole object.
    fn from_object(object: Map<String, Value>) -> Self {
        let mut pairs = Vec::with_capacity(object.len());
        for (key, value) in object {
            match value {
                Value::String(text) => pairs.push((key, text)),
                other => debug!("Skipping non-string translation for '{}': {}", key, other),
            }
        }
        Self(pairs)
    }
}

impl IntoIterator for RawTranslations {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Result of parsing a combined detect+translate response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutput {
    Parsed {
        source_language: String,
        translations: RawTranslations,
    },
    Unparseable,
}

#[derive(Debug, Deserialize)]
struct CombinedPayload {
    detected_language: String,
    translations: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchPayload {
    Wrapped { translations: Map<String, Value> },
    Flat(Map<String, Value>),
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fences(raw: &str) -> &str {
    match CODE_FENCE_RE.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw.trim(),
    }
}

/// Find every balanced top-level `{...}` slice, in order of appearance.
///
/// Braces inside JSON strings (including escaped quotes) are ignored. A `{`
/// that never closes is skipped and the scan resumes right after it.
pub fn balanced_objects(raw: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut from = 0;

    while let Some(offset) = raw[from..].find('{') {
        let start = from + offset;
        match object_len(&raw[start..]) {
            Some(len) => {
                objects.push(&raw[start..start + len]);
                from = start + len;
            }
            None => from = start + 1,
        }
    }

    objects
}

/// Byte length of the object opening at the start of `text`, if it closes.
fn object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse `raw` into `T`, tolerating code fences and surrounding prose.
pub fn parse_tolerant<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let stripped = strip_code_fences(raw);

    if let Ok(value) = serde_json::from_str::<T>(stripped) {
        return Some(value);
    }

    first_parseable_object(stripped)
}

// A candidate that does not parse may still wrap the object in prose
// braces, so its interior is searched as well.
fn first_parseable_object<T: DeserializeOwned>(text: &str) -> Option<T> {
    balanced_objects(text).into_iter().find_map(|candidate| {
        serde_json::from_str::<T>(candidate)
            .ok()
            .or_else(|| first_parseable_object(&candidate[1..candidate.len() - 1]))
    })
}

/// Parse a combined detect+translate response.
///
/// Both `detected_language` and `translations` must be present and
/// `translations` must be an object. Its non-string entries are skipped.
pub fn parse_combined(raw: &str) -> ModelOutput {
    match parse_tolerant::<CombinedPayload>(raw) {
        Some(payload) => ModelOutput::Parsed {
            source_language: payload.detected_language,
            translations: RawTranslations::from_object(payload.translations),
        },
        None => ModelOutput::Unparseable,
    }
}

/// Parse a batch translate-only response (`{code: text, ...}`).
///
/// A `{"translations": {...}}` envelope is accepted as well.
pub fn parse_batch(raw: &str) -> Option<RawTranslations> {
    let object = match parse_tolerant::<BatchPayload>(raw)? {
        BatchPayload::Wrapped { translations } => translations,
        BatchPayload::Flat(object) => object,
    };
    Some(RawTranslations::from_object(object))
}
