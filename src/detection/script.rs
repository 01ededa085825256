use crate::i18n::LanguageCode;
use tracing::debug;

/// Ratio thresholds for the script heuristic.
///
/// These are tunable; the defaults match the behaviour the bot has shipped
/// with. `Config` reads overrides from the environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorThresholds {
    /// Minimum Hangul ratio for Korean
    pub hangul: f64,
    /// Minimum Hiragana+Katakana ratio for Japanese
    pub kana: f64,
    /// Minimum CJK ideograph ratio for Chinese (only without any kana)
    pub cjk: f64,
    /// Minimum Latin letter ratio for English
    pub latin: f64,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            hangul: 0.2,
            kana: 0.2,
            cjk: 0.5,
            latin: 0.6,
        }
    }
}

/// Character counts per script class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptCounts {
    pub total: usize,
    pub hiragana: usize,
    pub katakana: usize,
    pub hangul: usize,
    pub cjk: usize,
    pub latin: usize,
}

impl ScriptCounts {
    pub fn of(text: &str) -> Self {
        let mut counts = Self::default();

        for c in text.chars() {
            counts.total += 1;
            match c {
                '\u{3040}'..='\u{309F}' => counts.hiragana += 1,
                '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}' => {
                    counts.katakana += 1
                }
                '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}' => {
                    counts.hangul += 1
                }
                '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' => counts.cjk += 1,
                'a'..='z' | 'A'..='Z' => counts.latin += 1,
                '\u{00C0}'..='\u{024F}' if c.is_alphabetic() => counts.latin += 1,
                _ => {}
            }
        }

        counts
    }

    fn ratio(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64
        }
    }
}

/// Guess the language from Unicode script ratios.
///
/// First matching rule wins:
/// 1. Hangul ratio >= `hangul` → Korean
/// 2. any Hiragana → Japanese
/// 3. Hiragana+Katakana ratio >= `kana` → Japanese
/// 4. CJK ratio >= `cjk` with no kana at all → Chinese
/// 5. Latin ratio >= `latin` → English
/// 6. English
pub fn detect_script(text: &str, thresholds: &DetectorThresholds) -> LanguageCode {
    let counts = ScriptCounts::of(text);
    let kana = counts.hiragana + counts.katakana;

    if counts.ratio(counts.hangul) >= thresholds.hangul && counts.hangul > 0 {
        LanguageCode::Ko
    } else if counts.hiragana > 0 {
        LanguageCode::Ja
    } else if counts.ratio(kana) >= thresholds.kana && kana > 0 {
        LanguageCode::Ja
    } else if counts.ratio(counts.cjk) >= thresholds.cjk && counts.cjk > 0 && kana == 0 {
        LanguageCode::ZhTw
    } else {
        if counts.ratio(counts.latin) < thresholds.latin {
            debug!("No script reached its threshold, defaulting to English");
        }
        LanguageCode::En
    }
}
