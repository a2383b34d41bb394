//! Backends built on rig completion models.

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionError, CompletionModel as RigCompletionModel};
use rig::message::Message;
use rig::one_or_many::OneOrMany;
use rig::prelude::CompletionClient;
use rig::providers::{anthropic, gemini, openai};

use super::{ChatMessage, LlmConfig, LlmProvider, Role, TextBackend, call_with_retries};
use crate::{Error, Result};

enum RigModel {
    OpenAi(openai::CompletionModel),
    Anthropic(anthropic::completion::CompletionModel),
    Gemini(gemini::completion::CompletionModel),
}

/// Text and vision backend delegating to a rig completion model.
pub struct RigBackend {
    model: RigModel,
    config: LlmConfig,
}

impl std::fmt::Debug for RigBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigBackend")
            .field("provider", &self.config.provider)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

/// Prompt split into rig's preamble, history and final prompt.
struct RigPrompt {
    preamble: Option<String>,
    history: Vec<Message>,
    prompt: String,
}

impl RigBackend {
    /// Connects to the provider named in the configuration.
    pub fn connect(config: LlmConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        let model = match config.provider {
            LlmProvider::OpenAi => {
                let client = openai::Client::new(api_key)
                    .map_err(|e| Error::provider("openai", e.to_string()))?
                    .completions_api();
                RigModel::OpenAi(client.completion_model(&config.model))
            }
            LlmProvider::Anthropic => {
                let client = anthropic::Client::new(api_key)
                    .map_err(|e| Error::provider("anthropic", e.to_string()))?;
                RigModel::Anthropic(client.completion_model(&config.model))
            }
            LlmProvider::Gemini => {
                let client = gemini::Client::new(api_key)
                    .map_err(|e| Error::provider("gemini", e.to_string()))?;
                RigModel::Gemini(client.completion_model(&config.model))
            }
        };

        Ok(Self { model, config })
    }

    async fn complete_once(&self, prompt: &RigPrompt) -> Result<String> {
        let provider = self.config.provider;
        let map_err = |e: CompletionError| Error::provider(provider, e.to_string());
        let preamble = prompt.preamble.clone().unwrap_or_default();
        let temperature = self.config.temperature;
        let max_tokens = self.config.max_tokens;

        match &self.model {
            RigModel::OpenAi(model) => model
                .completion_request(prompt.prompt.as_str())
                .preamble(preamble)
                .messages(prompt.history.clone())
                .temperature(temperature)
                .max_tokens(max_tokens)
                .send()
                .await
                .map(|r| extract_text_content(&r.choice))
                .map_err(map_err),
            RigModel::Anthropic(model) => model
                .completion_request(prompt.prompt.as_str())
                .preamble(preamble)
                .messages(prompt.history.clone())
                .temperature(temperature)
                .max_tokens(max_tokens)
                .send()
                .await
                .map(|r| extract_text_content(&r.choice))
                .map_err(map_err),
            RigModel::Gemini(model) => model
                .completion_request(prompt.prompt.as_str())
                .preamble(preamble)
                .messages(prompt.history.clone())
                .temperature(temperature)
                .max_tokens(max_tokens)
                .send()
                .await
                .map(|r| extract_text_content(&r.choice))
                .map_err(map_err),
        }
    }
}

#[async_trait]
impl TextBackend for RigBackend {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let prompt = split_messages(messages)?;
        call_with_retries(
            self.name(),
            self.config.max_retries,
            self.config.timeout(),
            || self.complete_once(&prompt),
        )
        .await
    }
}

/// Splits role-tagged messages into preamble, history and the final user prompt.
fn split_messages(messages: &[ChatMessage]) -> Result<RigPrompt> {
    let system: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(ChatMessage::text)
        .collect();
    let mut turns: Vec<&ChatMessage> = messages.iter().filter(|m| m.role != Role::System).collect();

    let last = match turns.pop() {
        Some(last) if last.role == Role::User => last,
        _ => return Err(Error::config("conversation must end with a user message")),
    };

    let history = turns
        .into_iter()
        .map(|m| match m.role {
            Role::Assistant => Message::assistant(m.text()),
            _ => Message::user(m.to_prompt()),
        })
        .collect();

    Ok(RigPrompt {
        preamble: (!system.is_empty()).then(|| system.join("\n\n")),
        history,
        prompt: last.to_prompt(),
    })
}

/// Extracts text content from assistant content choices.
fn extract_text_content(choice: &OneOrMany<AssistantContent>) -> String {
    choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}
