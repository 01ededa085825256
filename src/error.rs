use crate::i18n::LanguageCode;
use thiserror::Error;

/// Failure of a single translation-provider call.
///
/// The orchestrator never propagates these; it uses them to decide whether
/// to trip the circuit breaker and then moves on to the next tier.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} quota exhausted ({status}): {body}")]
    Quota {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to send request to {provider}: {source}")]
    Network {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse {provider} response: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: &'static str },

    #[error("{provider} does not support {language}")]
    Unsupported {
        provider: &'static str,
        language: LanguageCode,
    },

    #[error("{provider} skipped: quota previously exhausted")]
    CircuitOpen { provider: &'static str },
}

impl ProviderError {
    /// Classify a non-success HTTP response.
    ///
    /// HTTP 429, or a body carrying a quota / rate-limit signature, is a
    /// `Quota` error; everything else is a plain `Api` error.
    pub fn from_status(provider: &'static str, status: u16, body: String) -> Self {
        if status == 429 || has_quota_signature(&body) {
            ProviderError::Quota {
                provider,
                status,
                body,
            }
        } else {
            ProviderError::Api {
                provider,
                status,
                body,
            }
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, ProviderError::Quota { .. })
    }
}

fn has_quota_signature(body: &str) -> bool {
    let body = body.to_lowercase();
    body.contains("quota")
        || body.contains("resource_exhausted")
        || body.contains("rate limit")
        || body.contains("rate_limit")
}
