use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chat_backend::{BackendError, ChatBackend, ChatMessage};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::session::Exchange;

const NOTICE_ERROR_CHARS: usize = 40;

/// Model chain and system prompt, fixed for the life of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub primary: String,
    pub fallbacks: Vec<String>,
    pub system_prompt: String,
}

impl ModelConfig {
    pub fn new(
        primary: impl Into<String>,
        fallbacks: Vec<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            primary: primary.into(),
            fallbacks,
            system_prompt: system_prompt.into(),
        }
    }

    /// Primary followed by fallbacks, in attempt order.
    pub fn chain(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryReply {
    pub model: String,
    pub text: String,
}

/// Every model in the chain failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("all {count} configured models failed; primary error: {primary_error}", count = .attempted.len())]
pub struct AllBackendsFailed {
    pub attempted: Vec<String>,
    pub primary_error: String,
}

impl AllBackendsFailed {
    /// Operator-facing notice with the primary error cut to 40 characters.
    pub fn notice(&self) -> String {
        format!(
            "ERROR: No models available. {}\nCheck Ollama connection.",
            truncate_chars(&self.primary_error, NOTICE_ERROR_CHARS)
        )
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

pub struct QueryPipeline {
    config: ModelConfig,
    backend: Arc<dyn ChatBackend>,
}

impl QueryPipeline {
    pub fn new(config: ModelConfig, backend: Arc<dyn ChatBackend>) -> Self {
        Self { config, backend }
    }

    /// Builds `[system] + history`.
    pub fn messages_for(&self, history: &[Exchange]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(self.config.system_prompt.clone()));
        messages.extend(history.iter().map(Exchange::to_chat_message));
        messages
    }

    /// Tries the primary model then each fallback, stopping at the first reply.
    ///
    /// `history` must already end with the user's turn; `user_text` is only
    /// used for logging.
    pub fn query(
        &self,
        history: &[Exchange],
        user_text: &str,
    ) -> Result<QueryReply, AllBackendsFailed> {
        let messages = self.messages_for(history);
        let mut attempted = Vec::new();
        let mut primary_error = None;

        info!(
            chars = user_text.chars().count(),
            turns = history.len(),
            "dispatching query"
        );

        for model in self.config.chain() {
            attempted.push(model.to_string());
            info!(model, backend = self.backend.backend_id(), "attempting model");

            match self.attempt(model, &messages) {
                Ok(text) => {
                    info!(model, chars = text.chars().count(), "model replied");
                    return Ok(QueryReply {
                        model: model.to_string(),
                        text,
                    });
                }
                Err(attempt_error) => {
                    warn!(model, error = %attempt_error, "model attempt failed");
                    primary_error.get_or_insert_with(|| attempt_error.to_string());
                }
            }
        }

        let failure = AllBackendsFailed {
            attempted,
            primary_error: primary_error.unwrap_or_default(),
        };
        error!(attempted = ?failure.attempted, "{failure}");
        Err(failure)
    }

    fn attempt(&self, model: &str, messages: &[ChatMessage]) -> Result<String, BackendError> {
        match catch_unwind(AssertUnwindSafe(|| self.backend.chat(model, messages))) {
            Ok(result) => result,
            Err(payload) => Err(BackendError::Other(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("backend panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("backend panicked: {message}")
    } else {
        "backend panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_lists_primary_first() {
        let config = ModelConfig::new("p", vec!["a".into(), "b".into()], "sys");
        assert_eq!(config.chain().collect::<Vec<_>>(), vec!["p", "a", "b"]);
    }

    #[test]
    fn notice_truncates_primary_error_to_forty_chars() {
        let failure = AllBackendsFailed {
            attempted: vec!["p".to_string()],
            primary_error: "e".repeat(90),
        };
        assert_eq!(
            failure.notice(),
            format!(
                "ERROR: No models available. {}\nCheck Ollama connection.",
                "e".repeat(40)
            )
        );
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 40), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn display_reports_attempt_count() {
        let failure = AllBackendsFailed {
            attempted: vec!["p".into(), "a".into()],
            primary_error: "refused".into(),
        };
        assert_eq!(
            failure.to_string(),
            "all 2 configured models failed; primary error: refused"
        );
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "backend panicked: boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "backend panicked");
    }
}
