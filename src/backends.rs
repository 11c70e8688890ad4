use std::sync::Arc;

use chat_backend::{BackendError, ChatBackend};
use chat_backend_mock::MockBackend;
use chat_backend_ollama::{OllamaBackend, OllamaBackendConfig};
use tracing::{error, info, warn};

use crate::config::{BackendKind, ConsoleConfig};

pub fn backend_for_config(config: &ConsoleConfig) -> Result<Arc<dyn ChatBackend>, BackendError> {
    match config.backend {
        BackendKind::Mock => Ok(Arc::new(MockBackend::default())),
        BackendKind::Ollama => {
            let mut ollama = OllamaBackendConfig::new(config.ollama_url.clone());
            if let Some(timeout) = config.ollama_timeout {
                ollama = ollama.with_timeout(timeout);
            }
            Ok(Arc::new(OllamaBackend::new(ollama)?))
        }
    }
}

/// Result of the startup model listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelAvailability {
    PrimaryInstalled { installed: Vec<String> },
    PrimaryMissing {
        installed: Vec<String>,
        suggestion: Option<String>,
    },
    NoneInstalled,
    Unknown { error: String },
}

impl ModelAvailability {
    pub fn installed(&self) -> Option<&[String]> {
        match self {
            Self::PrimaryInstalled { installed } | Self::PrimaryMissing { installed, .. } => {
                Some(installed)
            }
            Self::NoneInstalled => Some(&[]),
            Self::Unknown { .. } => None,
        }
    }
}

/// Lists installed models and logs whether `primary` is among them.
///
/// A name matches when it contains `primary`, so tagged names such as
/// `llama2:latest` count for `llama2`.
pub fn check_model_availability(backend: &dyn ChatBackend, primary: &str) -> ModelAvailability {
    info!(backend = backend.backend_id(), "checking available models");

    let installed = match backend.list_models() {
        Ok(installed) => installed,
        Err(list_error) => {
            error!(error = %list_error, "failed to list models at startup");
            warn!("is the model backend running?");
            return ModelAvailability::Unknown {
                error: list_error.to_string(),
            };
        }
    };

    if installed.is_empty() {
        warn!("no models installed on the backend");
        return ModelAvailability::NoneInstalled;
    }

    info!(models = ?installed, "available models");
    if installed.iter().any(|model| model.contains(primary)) {
        info!(primary, "primary model found");
        return ModelAvailability::PrimaryInstalled { installed };
    }

    warn!(primary, "primary model not found");
    let suggestion = installed
        .iter()
        .find(|model| model.to_ascii_lowercase().contains("llama"))
        .cloned();
    if let Some(suggestion) = &suggestion {
        info!(suggestion, "suggesting installed model");
    }

    ModelAvailability::PrimaryMissing {
        installed,
        suggestion,
    }
}
