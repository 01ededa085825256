//! Language detection for inbound messages.
//!
//! - `sanitize`: removes mentions and URLs before inference
//! - `script`: fast Unicode script-ratio heuristic
//! - `statistical`: trigram identification for longer text
//!
//! `detect` only runs when the combined detect+translate provider call
//! failed; otherwise the model's own detection is used.

mod sanitize;
mod script;
mod statistical;

pub use sanitize::sanitize;
pub use script::{detect_script, DetectorThresholds, ScriptCounts};
pub use statistical::{detect_statistical, MIN_STATISTICAL_LEN};

use crate::i18n::LanguageCode;
use tracing::debug;

/// Where a source-language decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionTier {
    Heuristic,
    Statistical,
    ModelReported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionResult {
    pub source_language: LanguageCode,
    pub tier: DetectionTier,
}

/// Detect the language of already sanitized text. Never fails.
///
/// Text of `MIN_STATISTICAL_LEN` characters or more goes through the
/// statistical detector first; anything it cannot map (or shorter text)
/// is decided by the script heuristic.
pub fn detect(text: &str, thresholds: &DetectorThresholds) -> DetectionResult {
    if let Some(source_language) = detect_statistical(text) {
        debug!("Statistical detector: {}", source_language);
        return DetectionResult {
            source_language,
            tier: DetectionTier::Statistical,
        };
    }

    let source_language = detect_script(text, thresholds);
    debug!("Script heuristic: {}", source_language);
    DetectionResult {
        source_language,
        tier: DetectionTier::Heuristic,
    }
}
