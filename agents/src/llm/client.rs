//! Blocking client for OpenAI-compatible `/chat/completions` endpoints
//! (OpenAI, Ollama, vLLM and similar servers).

use crate::AgentFailure;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Text of the first choice plus the token counts the server reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

pub struct ChatClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    json_mode: bool,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AgentFailure> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentFailure::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            temperature: None,
            json_mode: true,
            timeout,
        })
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Ask the server for a JSON object reply (`response_format`).
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, AgentFailure> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            response_format: self.json_mode.then_some(ResponseFormat {
                r#type: "json_object",
            }),
            stream: false,
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(url = %url, model = %self.model, messages = messages.len(), "chat request");
        let response = request.send().map_err(|e| self.transport_error(e))?;
        let status = response.status();
        debug!(status = status.as_u16(), "chat response");

        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentFailure::Authentication,
                StatusCode::TOO_MANY_REQUESTS => AgentFailure::RateLimited,
                _ => AgentFailure::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let parsed: ChatResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                AgentFailure::Timeout(self.timeout)
            } else {
                AgentFailure::Malformed(format!("response body: {e}"))
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AgentFailure::Malformed("response has no message content".into()))?;

        Ok(Completion {
            content,
            usage: parsed.usage.unwrap_or_default(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> AgentFailure {
        if err.is_timeout() {
            AgentFailure::Timeout(self.timeout)
        } else {
            AgentFailure::Transport(err.to_string())
        }
    }
}
