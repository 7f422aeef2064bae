//! Backend selection and credentials, resolved once at the process boundary.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

pub(crate) const VERDE_API_KEY_ENV: &str = "VERDE_API_KEY";
pub(crate) const VERDE_URL_ENV: &str = "VERDE_URL";
pub(crate) const VERDE_MODEL_ENV: &str = "VERDE_MODEL";
pub(crate) const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub(crate) const ANTHROPIC_BASE_URL_ENV: &str = "ANTHROPIC_BASE_URL";
pub(crate) const METAGEN_MODEL_ENV: &str = "METAGEN_MODEL";
pub(crate) const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";
pub(crate) const OLLAMA_MODEL_ENV: &str = "OLLAMA_MODEL";

const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-5-20250929";
pub(crate) const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
// IPv4 loopback: `localhost` may resolve to ::1 while Ollama listens on IPv4 only.
pub(crate) const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// LiteLLM proxy speaking the OpenAI chat-completions protocol.
    Verde,
    /// Anthropic Messages API.
    Claude,
    /// Local Ollama server.
    Ollama,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Verde, BackendKind::Claude, BackendKind::Ollama];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Verde => "verde",
            BackendKind::Claude => "claude",
            BackendKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown backend {s:?} (expected verde, claude or ollama)"))
    }
}

/// Everything a backend needs to make requests.
#[derive(Clone)]
pub struct AssistantConfig {
    pub kind: BackendKind,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AssistantConfig {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            model: None,
            api_key: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Read credentials and model names from the process environment.
    pub fn from_env(kind: BackendKind) -> Self {
        Self::from_lookup(kind, |key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup.
    ///
    /// Blank values count as unset. Missing credentials are not an error
    /// here; the backend reports them when it is asked to chat.
    pub fn from_lookup(kind: BackendKind, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::new(kind);
        match kind {
            BackendKind::Verde => {
                config.api_key = get(VERDE_API_KEY_ENV);
                config.base_url = get(VERDE_URL_ENV);
                config.model = get(VERDE_MODEL_ENV);
            }
            BackendKind::Claude => {
                config.api_key = get(ANTHROPIC_API_KEY_ENV);
                config.base_url = get(ANTHROPIC_BASE_URL_ENV);
                config.model =
                    Some(get(METAGEN_MODEL_ENV).unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string()));
            }
            BackendKind::Ollama => {
                config.base_url =
                    Some(get(OLLAMA_HOST_ENV).unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()));
                config.model = get(OLLAMA_MODEL_ENV);
            }
        }
        config
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
