//! Primary translation provider: an OpenAI-compatible chat completions API.
//!
//! Three request shapes are built here (combined detect+translate, batch
//! translate-only, single-language translate-only). Interpreting the
//! answers is left to `translation`.

use crate::config::Config;
use crate::error::ProviderError;
use crate::i18n::LanguageCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "OpenAI";

/// OpenAI Chat Completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Fidelity rules shared by every translation request
pub fn build_system_prompt() -> String {
    r#"You are a professional translator for a multilingual group chat.

## Translation Rules
- Translate faithfully and naturally; do not summarize or explain
- Preserve every line break exactly as in the original
- Do not add punctuation that is not in the original
- Preserve symbols, numbers, @mentions and URLs as they are
- Keep Unicode emoji untouched and in the same position
- Remove textual emoji placeholders such as "(emoji)", "(絵文字)" or "(sticker)"

## Output
- Answer only with what is requested; no commentary"#
        .to_string()
}

fn language_list(languages: &[LanguageCode]) -> String {
    languages
        .iter()
        .map(|lang| format!("\"{}\" ({})", lang.code(), lang.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn json_escaped(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// Combined detect+translate prompt.
///
/// The model must pick `detected_language` among `allowed` and translate
/// into every other allowed language.
pub fn build_combined_prompt(text: &str, allowed: &[LanguageCode]) -> String {
    format!(
        r#"Detect the language of the message below and translate it into every language of this list except the detected one: {languages}.

Use exactly these codes. If the message is in a language that is not in the list, set "detected_language" to its ISO 639-1 code and translate into all listed languages.

Respond with strict JSON only, no Markdown:
{{"detected_language": "<code>", "translations": {{"<code>": "<translation>", ...}}}}

Example 1
Message: "おはようございます"
Response: {{"detected_language": "ja", "translations": {{"ko": "좋은 아침입니다", "zh-TW": "早安", "en": "Good morning"}}}}

Example 2
Message: "See you tomorrow 👋"
Response: {{"detected_language": "en", "translations": {{"ja": "また明日 👋", "ko": "내일 봐요 👋", "zh-TW": "明天見 👋"}}}}

Message (JSON-escaped): {text}"#,
        languages = language_list(allowed),
        text = json_escaped(text),
    )
}

/// Batch translate-only prompt: all targets in one JSON object.
pub fn build_batch_prompt(text: &str, source: LanguageCode, targets: &[LanguageCode]) -> String {
    format!(
        r#"Translate the following {source} message into these languages: {languages}.

Respond with strict JSON only, no Markdown, one key per language code:
{{"<code>": "<translation>", ...}}

Message (JSON-escaped): {text}"#,
        source = source.name(),
        languages = language_list(targets),
        text = json_escaped(text),
    )
}

/// Single-language prompt: free text answer, no JSON envelope.
pub fn build_single_prompt(text: &str, source: LanguageCode, target: LanguageCode) -> String {
    format!(
        "Translate the following {} message into {}. Reply with the translation only.\n\n{}",
        source.name(),
        target.name(),
        text
    )
}

/// Client for the primary provider.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self::new(
            client,
            &config.openai_api_url,
            &config.openai_api_key,
            &config.openai_model,
        )
    }

    pub fn name(&self) -> &'static str {
        PROVIDER
    }

    fn build_request(&self, user_prompt: String) -> ChatRequest {
        // Reasoning models need higher token limits and don't support temperature
        let is_reasoning = is_reasoning_model(&self.model);

        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt,
                },
            ],
            max_completion_tokens: if is_reasoning { 16000 } else { 4000 },
            temperature: if is_reasoning { None } else { Some(0.3) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        }
    }

    /// Send one chat completion and return the assistant's text.
    ///
    /// No retries: a failure here makes the caller move to the next tier.
    pub async fn complete(&self, user_prompt: String) -> Result<String, ProviderError> {
        let request = self.build_request(user_prompt);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|source| ProviderError::Network {
                provider: PROVIDER,
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(ProviderError::from_status(PROVIDER, status, body));
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| ProviderError::Parse {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse { provider: PROVIDER })?;

        debug!("{} answered with {} chars", PROVIDER, content.chars().count());
        Ok(content)
    }

    pub async fn detect_and_translate(
        &self,
        text: &str,
        allowed: &[LanguageCode],
    ) -> Result<String, ProviderError> {
        self.complete(build_combined_prompt(text, allowed)).await
    }

    pub async fn translate_batch(
        &self,
        text: &str,
        source: LanguageCode,
        targets: &[LanguageCode],
    ) -> Result<String, ProviderError> {
        self.complete(build_batch_prompt(text, source, targets)).await
    }

    pub async fn translate_single(
        &self,
        text: &str,
        source: LanguageCode,
        target: LanguageCode,
    ) -> Result<String, ProviderError> {
        self.complete(build_single_prompt(text, source, target)).await
    }
}
