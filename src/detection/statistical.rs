use crate::i18n::LanguageCode;

/// Shorter input is left to the script heuristic.
pub const MIN_STATISTICAL_LEN: usize = 10;

/// Map a whatlang ISO 639-3 code onto `LanguageCode`.
fn map_iso639_3(code: &str) -> Option<LanguageCode> {
    match code {
        "jpn" => Some(LanguageCode::Ja),
        "kor" => Some(LanguageCode::Ko),
        "cmn" | "zho" | "yue" => Some(LanguageCode::ZhTw),
        "eng" => Some(LanguageCode::En),
        "fra" => Some(LanguageCode::Fr),
        _ => None,
    }
}

/// Trigram-based language identification.
///
/// Returns `None` for short text, for no or unreliable results, and for
/// languages outside the routable set; the caller falls back to the script
/// heuristic.
pub fn detect_statistical(text: &str) -> Option<LanguageCode> {
    if text.chars().count() < MIN_STATISTICAL_LEN {
        return None;
    }

    let info = whatlang::detect(text)?;
    if !info.is_reliable() {
        return None;
    }
    map_iso639_3(info.lang().code())
}
