//! Extract: ask the chat model to pull the report fields out of the OCR text.
//!
//! The model's answer is returned verbatim. It is expected to follow the
//! `Label: value` layout requested by the prompt, but nothing here parses or
//! validates it.

use crate::client::TransportClient;
use crate::config::ProcessorConfig;
use crate::error::MedOcrError;
use crate::output::TokenUsage;
use crate::prompts::{document_message, EXTRACTION_SYSTEM_PROMPT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// The model's answer plus token accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Build the chat payload for `text`.
pub fn build_chat_request(text: &str, config: &ProcessorConfig) -> ChatRequest {
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(EXTRACTION_SYSTEM_PROMPT);

    ChatRequest {
        model: config.chat_model.clone(),
        messages: vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(document_message(text)),
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Send `text` to the chat model and return the first choice verbatim.
///
/// Bounded by `config.extract_timeout_secs`; a timeout is a transport error
/// and no fallback result is produced.
pub async fn extract_fields(
    client: &TransportClient,
    text: &str,
    config: &ProcessorConfig,
) -> Result<Extraction, MedOcrError> {
    let payload = build_chat_request(text, config);
    debug!("Extracting from {} chars of OCR text", text.len());

    let endpoint = client.chat();
    let request = client.post(endpoint, "/chat/completions").json(&payload);
    let timeout = Duration::from_secs(config.extract_timeout_secs);
    let response: ChatResponse = client.send(endpoint, request, Some(timeout)).await?;

    let usage = response.usage;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| MedOcrError::MalformedResponse {
            service: endpoint.name().to_string(),
            detail: "response contained no choices".into(),
        })?;

    info!(
        "Extraction complete: {} chars, finish_reason={}",
        choice.message.content.len(),
        choice.finish_reason.as_deref().unwrap_or("unknown")
    );

    Ok(Extraction {
        content: choice.message.content,
        usage,
    })
}
