//! Chat backends for metagen
//!
//! The gap resolver only needs one capability from a language model: take an
//! ordered list of role-tagged messages and return a single text reply. That
//! capability is the [`Assistant`] trait; the concrete backends (a LiteLLM
//! proxy, Anthropic, a local Ollama server) are selected by an explicit
//! [`AssistantConfig`] built once at the process boundary.
//!
//! Replies are untrusted text. Validating them is the caller's job.

mod config;
mod providers;

pub use config::{AssistantConfig, BackendKind, DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT};
pub use providers::{build_backend, AnthropicBackend, LiteLlmBackend, OllamaBackend};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("{backend} backend requires {variable} (set it in your environment)")]
    MissingSetting {
        backend: &'static str,
        variable: &'static str,
    },
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("request to {backend} timed out after {secs}s")]
    Timeout { backend: &'static str, secs: u64 },
    #[error("failed to reach {backend} at {url}: {message}")]
    Network {
        backend: &'static str,
        url: String,
        message: String,
    },
    #[error("{backend} http error {status}: {body}")]
    Http {
        backend: &'static str,
        status: u16,
        body: String,
    },
    #[error("{backend} returned invalid JSON: {message}")]
    InvalidResponse {
        backend: &'static str,
        message: String,
    },
    #[error("{backend}: no text in response")]
    EmptyResponse { backend: &'static str },
}

/// A language-model backend that answers a conversation with one text reply.
pub trait Assistant: Send + Sync {
    /// Short backend name for reports (`verde`, `claude`, `ollama`, ...).
    fn name(&self) -> &str;

    /// Model identifier, when the backend knows it.
    fn model(&self) -> Option<&str>;

    fn chat(&self, messages: &[ChatMessage]) -> Result<String, AssistantError>;
}

impl<A: Assistant + ?Sized> Assistant for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> Option<&str> {
        (**self).model()
    }

    fn chat(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        (**self).chat(messages)
    }
}
