//! LanguageCode: the closed set of languages the bot understands.
//!
//! Every code coming out of a provider or a detector is funnelled into this
//! enum before the rest of the system sees it (see `normalize`).

use std::fmt;

/// Canonical language identifier.
///
/// The declaration order is the display order used when replies list
/// several translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LanguageCode {
    Ja,
    Ko,
    ZhTw,
    En,
    Fr,
    /// Anything we cannot route or label.
    Other,
}

/// Static metadata for a language.
#[derive(Debug, Clone)]
struct LanguageConfig {
    /// Canonical code exposed to providers and in prompts (e.g. "ja", "zh-TW")
    code: &'static str,

    /// English name, used inside prompts
    name: &'static str,

    /// Label shown in replies (flag + native name)
    label: &'static str,

    /// Target code understood by the secondary machine-translation provider
    deepl_code: Option<&'static str>,
}

const JA: LanguageConfig = LanguageConfig {
    code: "ja",
    name: "Japanese",
    label: "🇯🇵 日本語",
    deepl_code: Some("JA"),
};

const KO: LanguageConfig = LanguageConfig {
    code: "ko",
    name: "Korean",
    label: "🇰🇷 한국어",
    deepl_code: Some("KO"),
};

const ZH_TW: LanguageConfig = LanguageConfig {
    code: "zh-TW",
    name: "Traditional Chinese (Taiwan)",
    label: "🇹🇼 中文",
    deepl_code: Some("ZH-HANT"),
};

const EN: LanguageConfig = LanguageConfig {
    code: "en",
    name: "English",
    label: "🇺🇸 English",
    deepl_code: Some("EN-US"),
};

const FR: LanguageConfig = LanguageConfig {
    code: "fr",
    name: "French",
    label: "🇫🇷 Français",
    deepl_code: Some("FR"),
};

const OTHER: LanguageConfig = LanguageConfig {
    code: "und",
    name: "Unknown",
    label: "🌐 Other",
    deepl_code: None,
};

impl LanguageCode {
    /// Every routable language, in display order (excludes `Other`).
    pub const ALL: [LanguageCode; 5] = [
        LanguageCode::Ja,
        LanguageCode::Ko,
        LanguageCode::ZhTw,
        LanguageCode::En,
        LanguageCode::Fr,
    ];

    fn config(&self) -> &'static LanguageConfig {
        match self {
            LanguageCode::Ja => &JA,
            LanguageCode::Ko => &KO,
            LanguageCode::ZhTw => &ZH_TW,
            LanguageCode::En => &EN,
            LanguageCode::Fr => &FR,
            LanguageCode::Other => &OTHER,
        }
    }

    pub fn code(&self) -> &'static str {
        self.config().code
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn label(&self) -> &'static str {
        self.config().label
    }

    pub fn deepl_code(&self) -> Option<&'static str> {
        self.config().deepl_code
    }

    pub fn is_known(&self) -> bool {
        *self != LanguageCode::Other
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
