//! LLM-backed agent speaking the OpenAI chat completions protocol.

pub mod client;
pub mod parse;
pub mod prompt;
mod usage;

pub use client::{ChatClient, ChatMessage, Completion};
pub use usage::Usage;

use crate::{Agent, AgentDecision, AgentFailure, DecisionRequest};
use chess_core::Color;
use std::time::Duration;
use tracing::{debug, warn};

/// Where the chat backend lives. Both speak the same protocol; they differ
/// in defaults and in whether an API key is required.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Provider {
    /// A local Ollama server.
    #[default]
    Ollama,
    OpenAi,
}

impl Provider {
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Provider::Ollama => "http://localhost:11434/v1",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Ollama => "qwen2.5:7b",
            Provider::OpenAi => "gpt-4o",
        }
    }

    pub fn requires_api_key(self) -> bool {
        self == Provider::OpenAi
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub temperature: Option<f32>,
    /// Requests allowed before the agent refuses to continue.
    pub request_limit: u32,
    pub json_mode: bool,
}

impl LlmConfig {
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            endpoint: provider.default_endpoint().to_string(),
            model: provider.default_model().to_string(),
            api_key: None,
            timeout: Duration::from_secs(120),
            temperature: None,
            request_limit: 100,
            json_mode: true,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::for_provider(Provider::default())
    }
}

pub struct LlmAgent {
    name: String,
    client: ChatClient,
    system_prompt: String,
    usage: Usage,
    request_limit: u32,
}

impl LlmAgent {
    pub fn new(color: Color, config: LlmConfig) -> Result<Self, AgentFailure> {
        let client = ChatClient::new(
            &config.endpoint,
            &config.model,
            config.api_key,
            config.timeout,
        )?
        .with_temperature(config.temperature)
        .with_json_mode(config.json_mode);

        Ok(Self {
            name: format!("{color} ({})", config.model),
            client,
            system_prompt: prompt::system_prompt(color),
            usage: Usage::default(),
            request_limit: config.request_limit,
        })
    }
}

impl Agent for LlmAgent {
    fn decide(&mut self, request: &DecisionRequest<'_>) -> Result<AgentDecision, AgentFailure> {
        if self.usage.requests >= self.request_limit {
            warn!(agent = %self.name, limit = self.request_limit, "request limit reached");
            return Err(AgentFailure::UsageLimit {
                limit: self.request_limit,
            });
        }

        let messages = [
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prompt::turn_prompt(request)),
        ];
        self.usage.record_request();
        let completion = self.client.complete(&messages)?;
        self.usage.record_tokens(
            completion.usage.prompt_tokens,
            completion.usage.completion_tokens,
        );
        debug!(agent = %self.name, reply = %completion.content, "model reply");

        parse::parse_reply(&completion.content)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn usage(&self) -> Option<Usage> {
        Some(self.usage)
    }
}
