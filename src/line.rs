//! LINE Messaging API plumbing: webhook payloads, outbound messages, the
//! reply client and per-event processing.

use crate::config::Config;
use crate::formatter::{format_reply, ReplyLimits};
use crate::translation::{Orchestrator, ProviderState};
use anyhow::{Context, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// LINE webhook types
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    /// Kept as raw values so one malformed event does not reject the batch
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    pub reply_token: Option<String>,
    pub source: Option<Source>,
    pub message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: String,
    pub group_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

/// A group text message worth translating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    pub sender_id: Option<String>,
    pub group_id: String,
    pub reply_token: String,
}

impl Event {
    /// Keep only text messages posted in group chats. Text is trimmed;
    /// blank text is dropped.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        if self.kind != "message" {
            return None;
        }

        let message = self.message?;
        if message.kind != "text" {
            return None;
        }

        let source = self.source?;
        if source.kind != "group" {
            return None;
        }

        let text = message.text?.trim().to_string();
        if text.is_empty() {
            return None;
        }

        Some(InboundMessage {
            text,
            sender_id: source.user_id,
            group_id: source.group_id?,
            reply_token: self.reply_token?,
        })
    }
}

// Outbound message types

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Text {
        text: String,
    },
    Flex {
        #[serde(rename = "altText")]
        alt_text: String,
        contents: FlexContainer,
    },
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FlexContainer {
    Bubble { body: FlexComponent },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FlexComponent {
    Box {
        layout: &'static str,
        contents: Vec<FlexComponent>,
    },
    Separator {
        margin: &'static str,
    },
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        weight: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        size: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        margin: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        wrap: Option<bool>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [OutboundMessage],
}

/// Client for the LINE reply endpoint.
#[derive(Debug, Clone)]
pub struct LineClient {
    client: reqwest::Client,
    api_url: String,
    access_token: String,
}

impl LineClient {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            access_token: access_token.into(),
        }
    }

    /// Reply to an event. Not retried on failure.
    pub async fn reply(&self, reply_token: &str, messages: &[OutboundMessage]) -> Result<()> {
        let url = format!("{}/v2/bot/message/reply", self.api_url.trim_end_matches('/'));

        let request = ReplyRequest {
            reply_token,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to LINE reply API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LINE API error ({}): {}", status, body);
        }

        Ok(())
    }
}

/// Shared by every request handler.
pub struct AppState {
    pub channel_secret: String,
    pub line: LineClient,
    pub orchestrator: Orchestrator,
    pub limits: ReplyLimits,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let client = reqwest::Client::new();
        let state = Arc::new(ProviderState::new());

        Self {
            channel_secret: config.line_channel_secret.clone(),
            line: LineClient::new(
                client.clone(),
                &config.line_api_url,
                &config.line_channel_access_token,
            ),
            orchestrator: Orchestrator::from_config(client, config, state),
            limits: ReplyLimits::default(),
        }
    }
}

/// Terminal state of one processed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not a group text message
    Ignored,
    /// Translations delivered in this many messages
    Delivered { messages: usize },
    /// Every tier failed; the apology was delivered
    Apologized,
    /// The reply itself could not be delivered
    Failed,
}

/// Process one event: filter, translate, format, reply.
pub async fn process_event(state: &AppState, event: Event) -> Result<EventOutcome> {
    let Some(inbound) = event.into_inbound() else {
        return Ok(EventOutcome::Ignored);
    };

    info!(
        "Received message in group {} ({} chars)",
        inbound.group_id,
        inbound.text.chars().count()
    );

    let outcome = state
        .orchestrator
        .translate(&inbound.text, &inbound.group_id)
        .await;

    let messages = format_reply(&outcome.translations, &state.limits);

    state
        .line
        .reply(&inbound.reply_token, &messages)
        .await
        .with_context(|| format!("Failed to reply in group {}", inbound.group_id))?;

    if outcome.is_empty() {
        warn!("Translation failed in group {}; apology sent", inbound.group_id);
        Ok(EventOutcome::Apologized)
    } else {
        info!(
            "Delivered {} translations from {} in {} messages",
            outcome.translations.len(),
            outcome.source_language,
            messages.len()
        );
        Ok(EventOutcome::Delivered {
            messages: messages.len(),
        })
    }
}

/// Process every event of a webhook batch concurrently.
///
/// Errors never leave an event's own future, so one failing event cannot
/// affect its siblings.
pub async fn handle_webhook(state: &AppState, body: WebhookBody) -> Vec<EventOutcome> {
    let tasks = body.events.into_iter().map(|raw| async move {
        let event: Event = match serde_json::from_value(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!("Skipping unrecognized event: {}", e);
                return EventOutcome::Ignored;
            }
        };

        match process_event(state, event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Event processing failed: {:#}", e);
                EventOutcome::Failed
            }
        }
    });

    join_all(tasks).await
}
