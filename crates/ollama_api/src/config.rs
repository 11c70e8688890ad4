use std::time::Duration;

use crate::url::DEFAULT_OLLAMA_BASE_URL;

/// Transport configuration for Ollama requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Daemon root, normalized before use.
    pub base_url: String,
    /// Optional per-request timeout.
    pub timeout: Option<Duration>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl OllamaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
