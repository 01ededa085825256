//! Translation orchestration.
//!
//! Cascade, each step only when the previous one produced nothing usable:
//!
//! 1. combined detect+translate call to the primary provider
//! 2. local detection, then the `FallbackTier` list in order
//!    (batch call, then per-language primary → secondary)
//!
//! Every structured result passes through `normalize_translations`, and the
//! final map is restricted to the group's target languages.

mod breaker;
mod parse;
mod tiers;

pub use breaker::ProviderState;
pub use parse::{
    balanced_objects, parse_batch, parse_combined, strip_code_fences, ModelOutput, RawTranslations,
};
pub use tiers::{
    BatchTier, FallbackTier, GuardedPrimary, LanguageTranslator, PerLanguageTier, TierRequest,
};

use crate::config::Config;
use crate::deepl::DeepLClient;
use crate::detection::{detect, sanitize, DetectionTier, DetectorThresholds};
use crate::i18n::{normalize_code, normalize_translations, LanguageCode, RoutingTable, Translations};
use crate::openai::OpenAiClient;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of `Orchestrator::translate`. Empty `translations` means total failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub source_language: LanguageCode,
    pub detection: DetectionTier,
    /// Name of the tier that produced the translations, if any did
    pub tier: Option<&'static str>,
    pub translations: Translations,
}

impl TranslationOutcome {
    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}

pub struct Orchestrator {
    primary: Arc<OpenAiClient>,
    state: Arc<ProviderState>,
    routing: RoutingTable,
    thresholds: DetectorThresholds,
    fallbacks: Vec<Box<dyn FallbackTier>>,
}

impl Orchestrator {
    /// Build the standard cascade: batch, then per-language primary with
    /// the secondary provider (when configured) behind it.
    pub fn new(
        primary: Arc<OpenAiClient>,
        secondary: Option<Arc<DeepLClient>>,
        state: Arc<ProviderState>,
        routing: RoutingTable,
        thresholds: DetectorThresholds,
    ) -> Self {
        let mut chain: Vec<Arc<dyn LanguageTranslator>> = vec![Arc::new(GuardedPrimary::new(
            Arc::clone(&primary),
            Arc::clone(&state),
        ))];
        if let Some(secondary) = secondary {
            chain.push(secondary);
        }

        let fallbacks: Vec<Box<dyn FallbackTier>> = vec![
            Box::new(BatchTier::new(Arc::clone(&primary), Arc::clone(&state))),
            Box::new(PerLanguageTier::new(chain)),
        ];

        Self {
            primary,
            state,
            routing,
            thresholds,
            fallbacks,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config, state: Arc<ProviderState>) -> Self {
        let primary = Arc::new(OpenAiClient::from_config(client.clone(), config));
        let secondary = config
            .deepl_api_key
            .as_ref()
            .map(|key| Arc::new(DeepLClient::new(client, &config.deepl_api_url, key)));

        Self::new(
            primary,
            secondary,
            state,
            config.routing.clone(),
            config.detector_thresholds,
        )
    }

    /// Replace the fallback tiers (tier 1 is always the combined call).
    pub fn with_fallbacks(mut self, fallbacks: Vec<Box<dyn FallbackTier>>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    pub fn provider_state(&self) -> &Arc<ProviderState> {
        &self.state
    }

    /// Translate `text` for `group_id`. Never fails.
    pub async fn translate(&self, text: &str, group_id: &str) -> TranslationOutcome {
        if let Some(outcome) = self.try_combined(text, group_id).await {
            return outcome;
        }

        let detection = detect(&sanitize(text), &self.thresholds);
        let source = detection.source_language;
        let targets = self.routing.targets(group_id, source);
        info!(
            "Detected {} ({:?}); targets: {:?}",
            source,
            detection.tier,
            targets.iter().map(LanguageCode::code).collect::<Vec<_>>()
        );

        let mut outcome = TranslationOutcome {
            source_language: source,
            detection: detection.tier,
            tier: None,
            translations: Translations::new(),
        };

        if targets.is_empty() {
            debug!("No target languages for group {}", group_id);
            return outcome;
        }

        let request = TierRequest {
            text,
            source,
            targets: &targets,
        };

        for tier in &self.fallbacks {
            let Some(mut translations) = tier.attempt(&request).await else {
                continue;
            };
            restrict_to(&mut translations, source, &targets);

            if translations.is_empty() {
                warn!("Tier '{}' produced no usable translations", tier.name());
                continue;
            }

            info!("Tier '{}' translated into {} languages", tier.name(), translations.len());
            outcome.tier = Some(tier.name());
            outcome.translations = translations;
            return outcome;
        }

        warn!("All translation tiers failed for group {}", group_id);
        outcome
    }

    /// Tier 1. Not guarded by the breaker, but a quota error here trips it.
    async fn try_combined(&self, text: &str, group_id: &str) -> Option<TranslationOutcome> {
        let route = self.routing.route(group_id);

        let content = match self.primary.detect_and_translate(text, route).await {
            Ok(content) => content,
            Err(e) => {
                tiers::record_primary_error(&self.state, &e);
                warn!("Combined detect+translate failed: {}", e);
                return None;
            }
        };

        let ModelOutput::Parsed {
            source_language,
            translations,
        } = parse_combined(&content)
        else {
            warn!("Combined detect+translate response was not usable JSON");
            return None;
        };

        let source = normalize_code(&source_language);
        let targets = self.routing.targets(group_id, source);
        let mut translations = normalize_translations(source, translations);
        restrict_to(&mut translations, source, &targets);

        if translations.is_empty() {
            warn!(
                "Combined detect+translate returned no usable translations (detected '{}')",
                source_language
            );
            return None;
        }

        info!(
            "Combined call detected {} and translated into {} languages",
            source,
            translations.len()
        );
        Some(TranslationOutcome {
            source_language: source,
            detection: DetectionTier::ModelReported,
            tier: Some("combined"),
            translations,
        })
    }
}

/// Keep only the routed targets; the source key never survives.
fn restrict_to(translations: &mut Translations, source: LanguageCode, targets: &[LanguageCode]) {
    translations.retain(|lang, _| *lang != source && targets.contains(lang));
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn create_openai_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    fn create_orchestrator(
        openai: &MockServer,
        deepl: Option<&MockServer>,
        state: Arc<ProviderState>,
    ) -> Orchestrator {
        let client = reqwest::Client::new();
        let primary = Arc::new(OpenAiClient::new(
            client.clone(),
            format!("{}/v1/chat/completions", openai.uri()),
            "test-openai-key",
            "gpt-4o-mini",
        ));
        let secondary = deepl.map(|server| {
            Arc::new(DeepLClient::new(
                client,
                format!("{}/v2/translate", server.uri()),
                "test-deepl-key",
            ))
        });

        Orchestrator::new(
            primary,
            secondary,
            state,
            RoutingTable::default().with_group(
                "Cspecial",
                vec![
                    LanguageCode::Ja,
                    LanguageCode::En,
                    LanguageCode::Fr,
                    LanguageCode::ZhTw,
                ],
            ),
            DetectorThresholds::default(),
        )
    }

    async fn mount_combined(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("detected_language"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    // ==================== Tier 1 Tests ====================

    #[tokio::test]
    async fn test_combined_success() {
        let openai = MockServer::start().await;
        mount_combined(
            &openai,
            ResponseTemplate::new(200).set_body_json(create_openai_response(
                r#"{"detected_language":"ja","translations":{"ko":"안녕하세요","zh-TW":"你好","en":"Hello"}}"#,
            )),
        )
        .await;

        let orchestrator = create_orchestrator(&openai, None, Arc::new(ProviderState::new()));
        let outcome = orchestrator.translate("こんにちは", "Cgroup").await;

        assert_eq!(outcome.source_language, LanguageCode::Ja);
        assert_eq!(outcome.detection, DetectionTier::ModelReported);
        assert_eq!(outcome.tier, Some("combined"));
        assert_eq!(outcome.translations.len(), 3);
    }

    #[tokio::test]
    async fn test_combined_with_null_entry_is_still_used() {
        let openai = MockServer::start().await;
        mount_combined(
            &openai,
            ResponseTemplate::new(200).set_body_json(create_openai_response(
                r#"{"detected_language":"ja","translations":{"ko":"안녕","zh-TW":"你好","en":null}}"#,
            )),
        )
        .await;
        // Any other primary call would be a fallback tier
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&openai)
            .await;

        let orchestrator = create_orchestrator(&openai, None, Arc::new(ProviderState::new()));
        let outcome = orchestrator.translate("こんにちは", "Cgroup").await;

        assert_eq!(outcome.tier, Some("combined"));
        assert_eq!(outcome.translations.len(), 2);
        assert!(!outcome.translations.contains_key(&LanguageCode::En));
    }

    #[tokio::test]
    async fn test_combined_source_collision_is_removed() {
        let openai = MockServer::start().await;
        mount_combined(
            &openai,
            ResponseTemplate::new(200).set_body_json(create_openai_response(
                r#"{"detected_language":"zh-Hans","translations":{"zh-TW":"x","ja":"y"}}"#,
            )),
        )
        .await;

        let orchestrator = create_orchestrator(&openai, None, Arc::new(ProviderState::new()));
        let outcome = orchestrator.translate("你好世界", "Cgroup").await;

        assert_eq!(outcome.source_language, LanguageCode::ZhTw);
        assert_eq!(outcome.translations.len(), 1);
        assert_eq!(outcome.translations[&LanguageCode::Ja], "y");
    }

    #[tokio::test]
    async fn test_combined_drops_languages_outside_route() {
        let openai = MockServer::start().await;
        mount_combined(
            &openai,
            ResponseTemplate::new(200).set_body_json(create_openai_response(
                r#"{"detected_language":"en","translations":{"ja":"やあ","fr":"Salut","ko":"안녕"}}"#,
            )),
        )
        .await;

        let orchestrator = create_orchestrator(&openai, None, Arc::new(ProviderState::new()));
        let outcome = orchestrator.translate("Hi", "Cgroup").await;

        assert!(!outcome.translations.contains_key(&LanguageCode::Fr));
        assert_eq!(outcome.translations.len(), 2);
    }

    #[tokio::test]
    async fn test_special_group_route() {
        let openai = MockServer::start().await;
        mount_combined(
            &openai,
            ResponseTemplate::new(200).set_body_json(create_openai_response(
                r#"{"detected_language":"ja","translations":{"en":"Hi","fr":"Salut","zh-TW":"嗨","ko":"안녕"}}"#,
            )),
        )
        .await;

        let orchestrator = create_orchestrator(&openai, None, Arc::new(ProviderState::new()));
        let outcome = orchestrator.translate("やあ", "Cspecial").await;

        assert_eq!(
            outcome.translations.keys().copied().collect::<Vec<_>>(),
            vec![LanguageCode::ZhTw, LanguageCode::En, LanguageCode::Fr]
        );
    }

    // ==================== Fallback Tests ====================

    #[tokio::test]
    async fn test_unparseable_combined_falls_back_to_batch() {
        let openai = MockServer::start().await;
        mount_combined(
            &openai,
            ResponseTemplate::new(200).set_body_json(create_openai_response("I am not JSON")),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_openai_response(
                r#"{"ja":"皆さんこんにちは","ko":"여러분 안녕하세요","zh-TW":"大家好"}"#,
            )))
            .mount(&openai)
            .await;

        let orchestrator = create_orchestrator(&openai, None, Arc::new(ProviderState::new()));
        let outcome = orchestrator.translate("@田中 Hello everyone", "Cgroup").await;

        assert_eq!(outcome.source_language, LanguageCode::En);
        assert_eq!(outcome.tier, Some("batch"));
        assert_eq!(
            outcome.translations.keys().copied().collect::<Vec<_>>(),
            vec![LanguageCode::Ja, LanguageCode::Ko, LanguageCode::ZhTw]
        );
    }

    #[tokio::test]
    async fn test_total_failure_returns_empty() {
        let openai = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&openai)
            .await;

        let state = Arc::new(ProviderState::new());
        let orchestrator = create_orchestrator(&openai, None, Arc::clone(&state));
        let outcome = orchestrator.translate("こんにちは", "Cgroup").await;

        assert_eq!(outcome.source_language, LanguageCode::Ja);
        assert_eq!(outcome.detection, DetectionTier::Heuristic);
        assert!(outcome.is_empty());
        assert_eq!(outcome.tier, None);
        assert!(!state.is_tripped());
    }

    #[tokio::test]
    async fn test_quota_on_combined_skips_primary_for_fallbacks() {
        let openai = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("insufficient_quota"))
            .expect(1)
            .mount(&openai)
            .await;

        let deepl = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{ "text": "translated" }]
            })))
            .expect(3)
            .mount(&deepl)
            .await;

        let state = Arc::new(ProviderState::new());
        let orchestrator = create_orchestrator(&openai, Some(&deepl), Arc::clone(&state));
        let outcome = orchestrator.translate("こんにちは", "Cgroup").await;

        assert!(state.is_tripped());
        assert_eq!(outcome.tier, Some("per-language"));
        assert_eq!(outcome.translations.len(), 3);
    }

    #[tokio::test]
    async fn test_tripped_breaker_still_attempts_combined_once() {
        let openai = MockServer::start().await;
        // Only the combined call may reach the primary provider
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&openai)
            .await;

        let deepl = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{ "text": "translated" }]
            })))
            .mount(&deepl)
            .await;

        let state = Arc::new(ProviderState::new());
        state.trip();
        let orchestrator = create_orchestrator(&openai, Some(&deepl), state);
        let outcome = orchestrator.translate("Hello everyone", "Cgroup").await;

        assert_eq!(outcome.translations.len(), 3);
    }

    #[tokio::test]
    async fn test_per_language_mixes_primary_and_secondary() {
        let openai = MockServer::start().await;
        mount_combined(&openai, ResponseTemplate::new(500)).await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("strict JSON"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&openai)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("into Korean"))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_openai_response("안녕하세요")))
            .mount(&openai)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&openai)
            .await;

        let deepl = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(body_string_contains("target_lang=EN-US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{ "text": "Hello" }]
            })))
            .mount(&deepl)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&deepl)
            .await;

        let orchestrator = create_orchestrator(&openai, Some(&deepl), Arc::new(ProviderState::new()));
        let outcome = orchestrator.translate("こんにちは", "Cgroup").await;

        assert_eq!(outcome.tier, Some("per-language"));
        assert_eq!(outcome.translations.len(), 2);
        assert_eq!(outcome.translations[&LanguageCode::Ko], "안녕하세요");
        assert_eq!(outcome.translations[&LanguageCode::En], "Hello");
    }

    // ==================== Custom Tier Tests ====================

    struct CountingTier {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        result: Option<Translations>,
    }

    #[async_trait]
    impl FallbackTier for CountingTier {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self, _request: &TierRequest<'_>) -> Option<Translations> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn test_tiers_stop_at_first_success() {
        let openai = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&openai)
            .await;

        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));
        let third_calls = Arc::new(AtomicUsize::new(0));

        // Translation into the source language alone is not a usable result
        let source_only = Translations::from([(LanguageCode::En, "Hello".to_string())]);
        let useful = Translations::from([(LanguageCode::Ja, "やあ".to_string())]);

        let orchestrator = create_orchestrator(&openai, None, Arc::new(ProviderState::new()))
            .with_fallbacks(vec![
                Box::new(CountingTier {
                    name: "first",
                    calls: Arc::clone(&first_calls),
                    result: Some(source_only),
                }),
                Box::new(CountingTier {
                    name: "second",
                    calls: Arc::clone(&second_calls),
                    result: Some(useful),
                }),
                Box::new(CountingTier {
                    name: "third",
                    calls: Arc::clone(&third_calls),
                    result: None,
                }),
            ]);

        let outcome = orchestrator.translate("Hello everyone", "Cgroup").await;

        assert_eq!(outcome.tier, Some("second"));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_language_route_has_no_targets() {
        let openai = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&openai)
            .await;

        let client = reqwest::Client::new();
        let primary = Arc::new(OpenAiClient::new(
            client,
            format!("{}/v1/chat/completions", openai.uri()),
            "k",
            "gpt-4o-mini",
        ));
        let orchestrator = Orchestrator::new(
            primary,
            None,
            Arc::new(ProviderState::new()),
            RoutingTable::new(vec![LanguageCode::Ja]),
            DetectorThresholds::default(),
        );

        let outcome = orchestrator.translate("こんにちは", "Cgroup").await;
        assert!(outcome.is_empty());
    }
}
