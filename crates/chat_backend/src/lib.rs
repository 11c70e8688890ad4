//! Minimal backend-agnostic contract for one chat completion.
//!
//! This crate defines only the message shape, the failure type, and the
//! blocking `chat` call the console pipeline drives. Transport details and
//! retry/fallback orchestration live elsewhere.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of one model-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    /// Returns the wire name used by chat endpoints.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Backend-neutral chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Failure returned by a backend for one `chat` or `list_models` call.
///
/// Callers treat every variant the same way; the variants exist for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("model '{model}' not found")]
    ModelNotFound { model: String },

    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,

    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Other(String),

    #[error("operation not supported by this backend")]
    Unsupported,
}

impl From<String> for BackendError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

impl From<&str> for BackendError {
    fn from(message: &str) -> Self {
        Self::Other(message.to_string())
    }
}

/// Backend interface for executing one chat completion.
pub trait ChatBackend: Send + Sync + 'static {
    /// Stable identifier of the backend, used in logs and `MODEL` output.
    fn backend_id(&self) -> &str;

    /// Sends `messages` to `model` and returns the assistant reply text.
    ///
    /// The call blocks the calling thread until the backend answers or fails.
    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, BackendError>;

    /// Lists models installed on the backend.
    fn list_models(&self) -> Result<Vec<String>, BackendError> {
        Err(BackendError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendError, ChatBackend, ChatMessage, ChatRole};

    struct EchoBackend;

    impl ChatBackend for EchoBackend {
        fn backend_id(&self) -> &str {
            "echo"
        }

        fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, BackendError> {
            let last = messages
                .last()
                .ok_or_else(|| BackendError::from("empty message list"))?;
            Ok(format!("{model}:{}", last.content))
        }
    }

    #[test]
    fn role_wire_names_are_lowercase() {
        assert_eq!(ChatRole::System.as_str(), "system");
        assert_eq!(ChatRole::User.as_str(), "user");
        assert_eq!(ChatRole::Assistant.as_str(), "assistant");

        let json = serde_json::to_value(ChatMessage::assistant("hi")).expect("serialize message");
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn default_list_models_reports_unsupported() {
        assert_eq!(EchoBackend.list_models(), Err(BackendError::Unsupported));
    }

    #[test]
    fn chat_receives_ordered_messages() {
        let reply = EchoBackend
            .chat(
                "m1",
                &[ChatMessage::system("sys"), ChatMessage::user("hello")],
            )
            .expect("echo reply");
        assert_eq!(reply, "m1:hello");

        let error = EchoBackend.chat("m1", &[]).expect_err("empty list fails");
        assert_eq!(error.to_string(), "empty message list");
    }

    #[test]
    fn error_display_is_descriptive() {
        assert_eq!(
            BackendError::ModelNotFound {
                model: "llama2".to_string()
            }
            .to_string(),
            "model 'llama2' not found"
        );
        assert_eq!(
            BackendError::Status {
                status: 500,
                message: "boom".to_string()
            }
            .to_string(),
            "backend returned status 500: boom"
        );
    }
}
