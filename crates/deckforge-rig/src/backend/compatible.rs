//! OpenAI-compatible chat completions over plain HTTP.
//!
//! Used when a custom base URL is configured (vLLM, Ollama, OpenRouter and
//! similar gateways).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ChatMessage, ContentPart, LlmConfig, TextBackend, call_with_retries};
use crate::{Error, Result, TRACING_TARGET};

/// Backend posting to `{base_url}/chat/completions`.
#[derive(Clone)]
pub struct CompatibleBackend {
    http: Client,
    endpoint: String,
    config: LlmConfig,
}

impl std::fmt::Debug for CompatibleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatibleBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    temperature: f64,
    max_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompatibleBackend {
    /// Creates a backend for the configured base URL.
    pub fn connect(config: LlmConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| Error::config("an OpenAI-compatible backend requires a base URL"))?;
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        let http = Client::builder().timeout(config.timeout()).build()?;

        tracing::debug!(
            target: TRACING_TARGET,
            endpoint = %endpoint,
            model = %config.model,
            "Created OpenAI-compatible backend"
        );

        Ok(Self {
            http,
            endpoint,
            config,
        })
    }

    async fn complete_once(&self, body: &ChatCompletionRequest<'_>) -> Result<String> {
        let mut request = self.http.post(&self.endpoint).json(body);
        if let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::provider(
                &self.endpoint,
                format!("status {status}: {text}"),
            ));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::parse("response contained no message content"))
    }
}

#[async_trait]
impl TextBackend for CompatibleBackend {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: messages.iter().map(to_wire_message).collect(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        call_with_retries(
            self.name(),
            self.config.max_retries,
            self.config.timeout(),
            || self.complete_once(&body),
        )
        .await
    }
}

/// Converts a message into the chat completions wire shape.
///
/// Text-only messages use a plain string; messages with images use the
/// content-part array with `image_url` data URIs.
fn to_wire_message(message: &ChatMessage) -> Value {
    if !message.has_image() {
        return json!({ "role": message.role.as_ref(), "content": message.text() });
    }

    let parts: Vec<Value> = message
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => json!({ "type": "text", "text": text }),
            ContentPart::Image { .. } => json!({
                "type": "image_url",
                "image_url": { "url": part.data_uri().unwrap_or_default() }
            }),
        })
        .collect();
    json!({ "role": message.role.as_ref(), "content": parts })
}
