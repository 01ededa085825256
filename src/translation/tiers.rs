//! Fallback tiers tried after the combined detect+translate call failed.
//!
//! Each tier gets the text, the locally detected source language and the
//! target set, and either produces some translations or gives up. Tiers
//! never error; the orchestrator just moves on to the next one.

use crate::deepl::DeepLClient;
use crate::error::ProviderError;
use crate::i18n::{normalize_translations, LanguageCode, Translations};
use crate::openai::OpenAiClient;
use crate::translation::breaker::ProviderState;
use crate::translation::parse::{parse_batch, strip_code_fences};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Input shared by all fallback tiers.
#[derive(Debug, Clone, Copy)]
pub struct TierRequest<'a> {
    pub text: &'a str,
    pub source: LanguageCode,
    pub targets: &'a [LanguageCode],
}

#[async_trait]
pub trait FallbackTier: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` (or an empty map) means "no usable result, try the next tier".
    async fn attempt(&self, request: &TierRequest<'_>) -> Option<Translations>;
}

/// Translate a text into a single language.
#[async_trait]
pub trait LanguageTranslator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn translate(
        &self,
        text: &str,
        source: LanguageCode,
        target: LanguageCode,
    ) -> Result<String, ProviderError>;
}

/// Trip the breaker when a primary-provider error carries the quota signature.
pub(crate) fn record_primary_error(state: &ProviderState, error: &ProviderError) {
    if error.is_quota() {
        state.trip();
    }
}

// ==================== Tier 2: batch ====================

/// One primary-provider request for all targets at once.
pub struct BatchTier {
    primary: Arc<OpenAiClient>,
    state: Arc<ProviderState>,
}

impl BatchTier {
    pub fn new(primary: Arc<OpenAiClient>, state: Arc<ProviderState>) -> Self {
        Self { primary, state }
    }
}

#[async_trait]
impl FallbackTier for BatchTier {
    fn name(&self) -> &'static str {
        "batch"
    }

    async fn attempt(&self, request: &TierRequest<'_>) -> Option<Translations> {
        if self.state.is_tripped() {
            debug!("Batch tier skipped: primary provider quota exhausted");
            return None;
        }

        let content = match self
            .primary
            .translate_batch(request.text, request.source, request.targets)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                record_primary_error(&self.state, &e);
                warn!("Batch translation failed: {}", e);
                return None;
            }
        };

        let Some(raw) = parse_batch(&content) else {
            warn!("Batch translation response was not parseable JSON");
            return None;
        };

        Some(normalize_translations(request.source, raw))
    }
}

// ==================== Tier 3/4: per language ====================

/// Primary provider behind the circuit breaker, one language per call.
pub struct GuardedPrimary {
    primary: Arc<OpenAiClient>,
    state: Arc<ProviderState>,
}

impl GuardedPrimary {
    pub fn new(primary: Arc<OpenAiClient>, state: Arc<ProviderState>) -> Self {
        Self { primary, state }
    }
}

#[async_trait]
impl LanguageTranslator for GuardedPrimary {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn translate(
        &self,
        text: &str,
        source: LanguageCode,
        target: LanguageCode,
    ) -> Result<String, ProviderError> {
        if self.state.is_tripped() {
            return Err(ProviderError::CircuitOpen {
                provider: self.primary.name(),
            });
        }

        match self.primary.translate_single(text, source, target).await {
            Ok(content) => Ok(strip_code_fences(&content).to_string()),
            Err(e) => {
                record_primary_error(&self.state, &e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl LanguageTranslator for DeepLClient {
    fn name(&self) -> &'static str {
        DeepLClient::name(self)
    }

    async fn translate(
        &self,
        text: &str,
        _source: LanguageCode,
        target: LanguageCode,
    ) -> Result<String, ProviderError> {
        DeepLClient::translate(self, text, target).await
    }
}

/// For every target, try each translator in order until one succeeds.
///
/// Languages no translator could handle are left out of the result.
pub struct PerLanguageTier {
    chain: Vec<Arc<dyn LanguageTranslator>>,
}

impl PerLanguageTier {
    pub fn new(chain: Vec<Arc<dyn LanguageTranslator>>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl FallbackTier for PerLanguageTier {
    fn name(&self) -> &'static str {
        "per-language"
    }

    async fn attempt(&self, request: &TierRequest<'_>) -> Option<Translations> {
        let mut raw: Vec<(String, String)> = Vec::with_capacity(request.targets.len());

        for &target in request.targets {
            for translator in &self.chain {
                match translator.translate(request.text, request.source, target).await {
                    Ok(text) if !text.trim().is_empty() => {
                        raw.push((target.code().to_string(), text));
                        break;
                    }
                    Ok(_) => warn!("{} returned empty text for {}", translator.name(), target),
                    Err(e @ ProviderError::Unsupported { .. }) | Err(e @ ProviderError::CircuitOpen { .. }) => {
                        debug!("{}", e)
                    }
                    Err(e) => warn!("{} failed for {}: {}", translator.name(), target, e),
                }
            }
        }

        Some(normalize_translations(request.source, raw))
    }
}
