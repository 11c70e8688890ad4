//! Ollama-backed implementation of the shared `chat_backend` contract.
//!
//! This adapter drives the async `ollama_api` client on a per-call
//! current-thread runtime so the console's worker threads can stay blocking.

use std::sync::Arc;
use std::time::Duration;

use chat_backend::{BackendError, ChatBackend, ChatMessage};
use ollama_api::{ChatRequest, ModelTag, OllamaApiError, OllamaClient, OllamaConfig, WireMessage};

/// Stable backend identifier used by startup selection.
pub const OLLAMA_BACKEND_ID: &str = "ollama";

/// Runtime configuration for the Ollama backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaBackendConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl OllamaBackendConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_ollama_config(self) -> OllamaConfig {
        let config = OllamaConfig::new(self.base_url);
        match self.timeout {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }
}

trait ChatClient: Send + Sync {
    fn chat(&self, request: &ChatRequest) -> Result<String, OllamaApiError>;
    fn list_models(&self) -> Result<Vec<ModelTag>, OllamaApiError>;
}

#[derive(Debug)]
struct DefaultChatClient {
    client: OllamaClient,
}

impl DefaultChatClient {
    fn runtime() -> Result<tokio::runtime::Runtime, OllamaApiError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                OllamaApiError::Runtime(format!("failed to initialize tokio runtime: {error}"))
            })
    }
}

impl ChatClient for DefaultChatClient {
    fn chat(&self, request: &ChatRequest) -> Result<String, OllamaApiError> {
        let response = Self::runtime()?.block_on(self.client.chat(request))?;
        Ok(response.message.content)
    }

    fn list_models(&self) -> Result<Vec<ModelTag>, OllamaApiError> {
        Self::runtime()?.block_on(self.client.list_models())
    }
}

/// `ChatBackend` adapter backed by `ollama_api` transport primitives.
pub struct OllamaBackend {
    client: Arc<dyn ChatClient>,
}

impl OllamaBackend {
    /// Creates a backend using real HTTP transport.
    pub fn new(config: OllamaBackendConfig) -> Result<Self, BackendError> {
        let client = OllamaClient::new(config.into_ollama_config()).map_err(map_error)?;
        Ok(Self {
            client: Arc::new(DefaultChatClient { client }),
        })
    }

    #[cfg(test)]
    fn with_client_for_tests(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }
}

impl ChatBackend for OllamaBackend {
    fn backend_id(&self) -> &str {
        OLLAMA_BACKEND_ID
    }

    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let request = ChatRequest::new(model, messages.iter().map(to_wire).collect());
        self.client.chat(&request).map_err(map_error)
    }

    fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let tags = self.client.list_models().map_err(map_error)?;
        Ok(tags.into_iter().map(|tag| tag.name).collect())
    }
}

fn to_wire(message: &ChatMessage) -> WireMessage {
    WireMessage {
        role: message.role.as_str().to_string(),
        content: message.content.clone(),
    }
}

fn map_error(error: OllamaApiError) -> BackendError {
    if error.is_connect() {
        return BackendError::Unreachable(error.to_string());
    }

    match error {
        OllamaApiError::ModelNotFound(model) => BackendError::ModelNotFound { model },
        OllamaApiError::Timeout => BackendError::Timeout,
        OllamaApiError::Status(status, message) => BackendError::Status {
            status: status.as_u16(),
            message,
        },
        OllamaApiError::Decode(error) => BackendError::Malformed(error.to_string()),
        other => BackendError::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};

    use chat_backend::ChatRole;

    use super::*;

    enum FakeOutcome {
        Reply(String),
        Error(OllamaApiError),
    }

    struct FakeChatClient {
        observed: Mutex<Option<ChatRequest>>,
        outcome: Mutex<Option<FakeOutcome>>,
    }

    impl FakeChatClient {
        fn new(outcome: FakeOutcome) -> Arc<Self> {
            Arc::new(Self {
                observed: Mutex::new(None),
                outcome: Mutex::new(Some(outcome)),
            })
        }

        fn observed(&self) -> Option<ChatRequest> {
            lock_unpoisoned(&self.observed).clone()
        }
    }

    impl ChatClient for FakeChatClient {
        fn chat(&self, request: &ChatRequest) -> Result<String, OllamaApiError> {
            *lock_unpoisoned(&self.observed) = Some(request.clone());
            match lock_unpoisoned(&self.outcome).take() {
                Some(FakeOutcome::Reply(text)) => Ok(text),
                Some(FakeOutcome::Error(error)) => Err(error),
                None => panic!("fake outcome should be consumed exactly once"),
            }
        }

        fn list_models(&self) -> Result<Vec<ModelTag>, OllamaApiError> {
            Ok(vec![ModelTag {
                name: "llama2:latest".to_string(),
                size: None,
            }])
        }
    }

    fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn chat_translates_messages_to_wire_roles_in_order() {
        let fake = FakeChatClient::new(FakeOutcome::Reply("hi there".to_string()));
        let backend = OllamaBackend::with_client_for_tests(Arc::clone(&fake) as Arc<dyn ChatClient>);

        let reply = backend
            .chat(
                "llama2",
                &[
                    ChatMessage::system("sys"),
                    ChatMessage::new(ChatRole::User, "hello"),
                    ChatMessage::assistant("prior"),
                ],
            )
            .expect("reply");

        assert_eq!(reply, "hi there");
        let observed = fake.observed().expect("request observed");
        assert_eq!(observed.model, "llama2");
        assert!(!observed.stream);
        let roles: Vec<&str> = observed
            .messages
            .iter()
            .map(|message| message.role.as_str())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
    }

    #[test]
    fn transport_errors_map_to_backend_errors() {
        let backend = OllamaBackend::with_client_for_tests(FakeChatClient::new(
            FakeOutcome::Error(OllamaApiError::ModelNotFound("ghost".to_string())),
        ));
        assert_eq!(
            backend.chat("ghost", &[]),
            Err(BackendError::ModelNotFound {
                model: "ghost".to_string()
            })
        );

        let backend = OllamaBackend::with_client_for_tests(FakeChatClient::new(
            FakeOutcome::Error(OllamaApiError::Timeout),
        ));
        assert_eq!(backend.chat("m", &[]), Err(BackendError::Timeout));

        let backend = OllamaBackend::with_client_for_tests(FakeChatClient::new(
            FakeOutcome::Error(OllamaApiError::Runtime("boom".to_string())),
        ));
        assert_eq!(
            backend.chat("m", &[]),
            Err(BackendError::Other("boom".to_string()))
        );
    }

    #[test]
    fn list_models_keeps_full_tag_names() {
        let backend = OllamaBackend::with_client_for_tests(FakeChatClient::new(
            FakeOutcome::Reply(String::new()),
        ));
        assert_eq!(
            backend.list_models(),
            Ok(vec!["llama2:latest".to_string()])
        );
        assert_eq!(backend.backend_id(), OLLAMA_BACKEND_ID);
    }

    #[test]
    fn invalid_base_url_fails_construction() {
        let error = match OllamaBackend::new(OllamaBackendConfig::new("not a url")) {
            Ok(_) => panic!("invalid base URL should fail"),
            Err(error) => error,
        };
        assert!(error.to_string().contains("invalid base URL"));
    }
}
