use crate::detection::DetectorThresholds;
use crate::i18n::RoutingTable;
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // LINE
    pub line_channel_access_token: String,
    pub line_channel_secret: String,
    pub line_api_url: String,

    // OpenAI (primary provider)
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,

    // DeepL (secondary provider, optional)
    pub deepl_api_key: Option<String>,
    pub deepl_api_url: String,

    // Routing
    pub routing: RoutingTable,

    // Detection
    pub detector_thresholds: DetectorThresholds,

    // Server
    pub port: u16,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let thresholds = DetectorThresholds::default();

        Ok(Self {
            // LINE
            line_channel_access_token: std::env::var("LINE_CHANNEL_ACCESS_TOKEN")
                .context("LINE_CHANNEL_ACCESS_TOKEN not set")?,
            line_channel_secret: std::env::var("LINE_CHANNEL_SECRET")
                .context("LINE_CHANNEL_SECRET not set")?,
            line_api_url: env_or("LINE_API_URL", "https://api.line.me"),

            // OpenAI
            openai_api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
            openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            openai_api_url: env_or(
                "OPENAI_API_URL",
                "https://api.openai.com/v1/chat/completions",
            ),

            // DeepL
            deepl_api_key: std::env::var("DEEPL_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            deepl_api_url: env_or("DEEPL_API_URL", "https://api-free.deepl.com/v2/translate"),

            // Routing
            routing: RoutingTable::parse(
                &env_or("DEFAULT_TARGET_LANGUAGES", "ja,ko,zh-TW,en"),
                &env_or("GROUP_LANGUAGE_ROUTES", ""),
            )
            .context("Invalid language routing configuration")?,

            // Detection
            detector_thresholds: DetectorThresholds {
                hangul: env_f64("DETECT_HANGUL_RATIO", thresholds.hangul),
                kana: env_f64("DETECT_KANA_RATIO", thresholds.kana),
                cjk: env_f64("DETECT_CJK_RATIO", thresholds.cjk),
                latin: env_f64("DETECT_LATIN_RATIO", thresholds.latin),
            },

            // Server
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        })
    }
}
