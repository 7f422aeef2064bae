//! Concrete chat backends over blocking HTTP.

use crate::config::{
    ANTHROPIC_API_KEY_ENV, DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_OLLAMA_HOST, METAGEN_MODEL_ENV,
    OLLAMA_MODEL_ENV, VERDE_API_KEY_ENV, VERDE_MODEL_ENV, VERDE_URL_ENV,
};
use crate::{Assistant, AssistantConfig, AssistantError, BackendKind, ChatMessage, Role};
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Construct the backend named by `config.kind`.
pub fn build_backend(config: AssistantConfig) -> Box<dyn Assistant> {
    match config.kind {
        BackendKind::Verde => Box::new(LiteLlmBackend::new(config)),
        BackendKind::Claude => Box::new(AnthropicBackend::new(config)),
        BackendKind::Ollama => Box::new(OllamaBackend::new(config)),
    }
}

fn require<'a>(
    value: Option<&'a str>,
    backend: &'static str,
    variable: &'static str,
) -> Result<&'a str, AssistantError> {
    value.ok_or(AssistantError::MissingSetting { backend, variable })
}

fn normalize_base_url(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

fn role_messages(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect()
}

// Error bodies end up in the report, so keep only a short prefix.
fn truncate_error_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

fn http_client(timeout: Duration) -> Result<Client, AssistantError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AssistantError::Client(e.to_string()))
}

// Send a request and return the parsed JSON body of a successful response.
fn send_json(
    backend: &'static str,
    url: &str,
    timeout: Duration,
    request: RequestBuilder,
) -> Result<Value, AssistantError> {
    tracing::debug!(backend, url, "sending chat request");
    let resp = request.send().map_err(|e| {
        if e.is_timeout() {
            AssistantError::Timeout {
                backend,
                secs: timeout.as_secs(),
            }
        } else {
            AssistantError::Network {
                backend,
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    })?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = truncate_error_body(&resp.text().unwrap_or_default());
        return Err(AssistantError::Http {
            backend,
            status,
            body,
        });
    }

    resp.json().map_err(|e| AssistantError::InvalidResponse {
        backend,
        message: e.to_string(),
    })
}

// =============================================================================
// LiteLLM proxy (OpenAI chat-completions protocol)
// =============================================================================

pub struct LiteLlmBackend {
    config: AssistantConfig,
}

impl LiteLlmBackend {
    const NAME: &'static str = "verde";

    pub fn new(config: AssistantConfig) -> Self {
        Self { config }
    }
}

pub(crate) fn chat_completion_text(v: &Value) -> Option<String> {
    let text = v.get("choices")?.get(0)?.get("message")?.get("content")?.as_str()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl Assistant for LiteLlmBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn model(&self) -> Option<&str> {
        self.config.model.as_deref()
    }

    fn chat(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        let api_key = require(self.config.api_key.as_deref(), Self::NAME, VERDE_API_KEY_ENV)?;
        let base_url = require(self.config.base_url.as_deref(), Self::NAME, VERDE_URL_ENV)?;
        let model = require(self.model(), Self::NAME, VERDE_MODEL_ENV)?;
        let url = format!("{}/chat/completions", normalize_base_url(base_url));

        let body = json!({
            "model": model,
            "messages": role_messages(messages),
            "temperature": 0,
            "max_tokens": self.config.max_tokens,
        });

        let client = http_client(self.config.timeout)?;
        let request = client.post(&url).bearer_auth(api_key).json(&body);
        let data = send_json(Self::NAME, &url, self.config.timeout, request)?;
        chat_completion_text(&data).ok_or(AssistantError::EmptyResponse { backend: Self::NAME })
    }
}

// =============================================================================
// Anthropic (Messages API)
// =============================================================================

pub struct AnthropicBackend {
    config: AssistantConfig,
}

impl AnthropicBackend {
    const NAME: &'static str = "claude";

    pub fn new(config: AssistantConfig) -> Self {
        Self { config }
    }
}

pub(crate) fn anthropic_text(v: &Value) -> Option<String> {
    let blocks = v.get("content")?.as_array()?;
    let text = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl Assistant for AnthropicBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn model(&self) -> Option<&str> {
        self.config.model.as_deref()
    }

    fn chat(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        let api_key = require(self.config.api_key.as_deref(), Self::NAME, ANTHROPIC_API_KEY_ENV)?;
        let model = require(self.model(), Self::NAME, METAGEN_MODEL_ENV)?;
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_ANTHROPIC_BASE_URL);
        let url = format!("{}/v1/messages", normalize_base_url(base_url));

        // Anthropic takes the system prompt out of band.
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let turns: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": self.config.max_tokens,
            "temperature": 0,
            "messages": turns,
        });
        if !system.is_empty() {
            body["system"] = json!(system);
        }

        let client = http_client(self.config.timeout)?;
        let request = client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let data = send_json(Self::NAME, &url, self.config.timeout, request)?;
        anthropic_text(&data).ok_or(AssistantError::EmptyResponse { backend: Self::NAME })
    }
}

// =============================================================================
// Ollama (native /api/chat)
// =============================================================================

pub struct OllamaBackend {
    config: AssistantConfig,
}

impl OllamaBackend {
    const NAME: &'static str = "ollama";

    pub fn new(config: AssistantConfig) -> Self {
        Self { config }
    }
}

pub(crate) fn ollama_text(v: &Value) -> Option<String> {
    let text = v.get("message")?.get("content")?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl Assistant for OllamaBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn model(&self) -> Option<&str> {
        self.config.model.as_deref()
    }

    fn chat(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        let model = require(self.model(), Self::NAME, OLLAMA_MODEL_ENV)?;
        let host = self.config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_HOST);
        let url = format!("{}/api/chat", normalize_base_url(host));

        let body = json!({
            "model": model,
            "stream": false,
            "format": "json",
            "messages": role_messages(messages),
            "options": {
                "temperature": 0,
                "num_predict": self.config.max_tokens
            }
        });

        let client = http_client(self.config.timeout)?;
        let request = client.post(&url).json(&body);
        let data = send_json(Self::NAME, &url, self.config.timeout, request)?;
        ollama_text(&data).ok_or(AssistantError::EmptyResponse { backend: Self::NAME })
    }
}
