//! Collapse provider-specific language tags onto `LanguageCode`.
//!
//! Providers answer with whatever tag they feel like ("zh-Hans", "zh_CN",
//! "JA", "jpn", "Chinese"...). Everything is normalized here before it is
//! used as a key.

use crate::i18n::LanguageCode;
use std::collections::BTreeMap;
use tracing::debug;

/// Translated text keyed by target language.
pub type Translations = BTreeMap<LanguageCode, String>;

/// Normalize a raw language tag or name.
///
/// Every Chinese variant (simplified, traditional, region-qualified) maps to
/// `ZhTw`. Unrecognized tags map to `Other`. Normalizing a canonical code is
/// a no-op.
pub fn normalize_code(raw: &str) -> LanguageCode {
    let tag = raw.trim().to_lowercase().replace('_', "-");
    let primary = tag.split('-').next().unwrap_or("");

    match primary {
        "zh" | "zho" | "chi" | "cmn" => LanguageCode::ZhTw,
        "ja" | "jp" | "jpn" => LanguageCode::Ja,
        "ko" | "kr" | "kor" => LanguageCode::Ko,
        "en" | "eng" => LanguageCode::En,
        "fr" | "fra" | "fre" => LanguageCode::Fr,
        _ => match tag.as_str() {
            t if t.contains("chinese") || t.contains("mandarin") => LanguageCode::ZhTw,
            "japanese" => LanguageCode::Ja,
            "korean" => LanguageCode::Ko,
            "english" => LanguageCode::En,
            "french" => LanguageCode::Fr,
            _ => LanguageCode::Other,
        },
    }
}

/// Normalize a provider's raw `(tag, text)` pairs into `Translations`.
///
/// - keys are passed through `normalize_code`; `Other` keys and blank texts
///   are dropped
/// - when two raw keys collapse onto the same code, the shorter text wins
///   (on a tie, the pair that came first in `pairs`, which keeps the
///   provider's listing order)
/// - the source language key is removed last, whatever the provider sent
pub fn normalize_translations<I, K, V>(source: LanguageCode, pairs: I) -> Translations
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut translations = Translations::new();

    for (raw_key, raw_text) in pairs {
        let lang = normalize_code(raw_key.as_ref());
        if !lang.is_known() {
            debug!("Dropping translation with unrecognized key '{}'", raw_key.as_ref());
            continue;
        }

        let text = raw_text.as_ref().trim();
        if text.is_empty() {
            continue;
        }

        match translations.get(&lang) {
            Some(existing) if existing.chars().count() <= text.chars().count() => {
                debug!(
                    "Key '{}' collapsed onto {}, keeping the shorter existing text",
                    raw_key.as_ref(),
                    lang
                );
            }
            _ => {
                translations.insert(lang, text.to_string());
            }
        }
    }

    if translations.remove(&source).is_some() {
        debug!("Removed translation into the source language {}", source);
    }

    translations
}
