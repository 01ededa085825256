use crate::error::ProviderError;
use crate::i18n::LanguageCode;
use serde::Deserialize;

const PROVIDER: &str = "DeepL";

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// Secondary machine-translation provider.
#[derive(Debug, Clone)]
pub struct DeepLClient {
    client: reqwest::Client,
    api_url: String,
    auth_key: String,
}

impl DeepLClient {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            auth_key: auth_key.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        PROVIDER
    }

    /// Translate `text` into `target`.
    ///
    /// Languages without a DeepL code are rejected with `Unsupported` before
    /// any request is sent.
    pub async fn translate(&self, text: &str, target: LanguageCode) -> Result<String, ProviderError> {
        let target_lang = target.deepl_code().ok_or(ProviderError::Unsupported {
            provider: PROVIDER,
            language: target,
        })?;

        let response = self
            .client
            .post(&self.api_url)
            .form(&[
                ("auth_key", self.auth_key.as_str()),
                ("text", text),
                ("target_lang", target_lang),
            ])
            .send()
            .await
            .map_err(|source| ProviderError::Network {
                provider: PROVIDER,
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(PROVIDER, status, body));
        }

        let deepl_response: DeepLResponse =
            response.json().await.map_err(|e| ProviderError::Parse {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        deepl_response
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse { provider: PROVIDER })
    }
}
