//! OpenAI-compatible chat completions
//!
//! Works with any endpoint speaking the `/v1/chat/completions` dialect,
//! including gateways in front of hosted models.

use crate::error::SetupError;
use async_trait::async_trait;
use quill_llm::{LlmClient, LlmError, LlmRequest, LlmResponse, Message};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Full chat-completions URL
    pub endpoint: String,
    /// Model id sent with every request
    pub model: String,
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
    /// Whole-request timeout
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

impl ChatConfig {
    /// With endpoint URL
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// With model id
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Chat-completions client
pub struct OpenAiCompatibleLlm {
    client: reqwest::Client,
    api_key: Option<String>,
    config: ChatConfig,
}

impl OpenAiCompatibleLlm {
    /// Create client
    ///
    /// # Errors
    /// `SetupError::Http` if the HTTP client cannot be built.
    pub fn new(config: ChatConfig, api_key: Option<String>) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            config,
        })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn chat_messages(request: &LlmRequest) -> Vec<ChatMessage<'_>> {
    std::iter::once(ChatMessage {
        role: "system",
        content: &request.system_prompt,
    })
    .chain(request.messages.iter().map(|m: &Message| ChatMessage {
        role: match m.role {
            quill_llm::Role::User => "user",
            quill_llm::Role::Assistant => "assistant",
        },
        content: &m.content,
    }))
    .collect()
}

/// Decode a chat-completions body
///
/// # Errors
/// `LlmError::InvalidResponse` if the body has no first choice with content.
pub fn parse_chat_response(body: &str) -> Result<LlmResponse, LlmError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::InvalidResponse("missing choices".to_string()))?;
    let usage = parsed.usage.unwrap_or_default();
    Ok(LlmResponse::new(content, usage.prompt_tokens, usage.completion_tokens))
}

fn status_error(status: StatusCode, body: &str) -> LlmError {
    let message = format!("HTTP {status}: {body}");
    match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth(message),
        s if s.is_server_error() => LlmError::Unavailable(message),
        _ => LlmError::Rejected(message),
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleLlm {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: chat_messages(&request),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut builder = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let reply = parse_chat_response(&text)?;
        debug!(
            model = %self.config.model,
            input_tokens = reply.input_tokens,
            output_tokens = reply.output_tokens,
            "chat completion"
        );
        Ok(reply)
    }
}
