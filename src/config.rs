//! Environment configuration.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::lockout::DEFAULT_LOCKOUT_DELAY;

pub const BACKEND_ENV_VAR: &str = "CONTAINMENT_BACKEND";
pub const PROMPT_PATH_ENV_VAR: &str = "CONTAINMENT_PROMPT_PATH";
pub const MODEL_ENV_VAR: &str = "CONTAINMENT_MODEL";
pub const FALLBACK_MODELS_ENV_VAR: &str = "CONTAINMENT_FALLBACK_MODELS";
pub const OLLAMA_URL_ENV_VAR: &str = "CONTAINMENT_OLLAMA_URL";
pub const OLLAMA_TIMEOUT_ENV_VAR: &str = "CONTAINMENT_OLLAMA_TIMEOUT_SEC";
pub const LOCKOUT_SECS_ENV_VAR: &str = "CONTAINMENT_LOCKOUT_SECS";
pub const LOG_PATH_ENV_VAR: &str = "CONTAINMENT_LOG_PATH";

pub const DEFAULT_PROMPT_PATH: &str = "system_prompt.json";
pub const DEFAULT_PRIMARY_MODEL: &str = "mannix/llama3.1-8b-abliterated";
pub const DEFAULT_FALLBACK_MODELS: [&str; 3] = ["llama2", "mistral", "neural-chat"];
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_LOG_PATH: &str = "scp-079.log";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are SCP-079.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported backend '{value}'; available backends: ollama, mock")]
    UnsupportedBackend { value: String },

    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidSeconds { var: &'static str, value: String },

    #[error("failed to read system prompt at {path}: {source}")]
    PromptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse system prompt at {path}: {source}")]
    PromptParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("system prompt at {path} is empty")]
    EmptyPrompt { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Ollama,
    Mock,
}

impl BackendKind {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            _ => Err(ConfigError::UnsupportedBackend {
                value: value.to_string(),
            }),
        }
    }
}

/// Startup configuration resolved once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub backend: BackendKind,
    pub prompt_path: PathBuf,
    pub primary_model: String,
    pub fallback_models: Vec<String>,
    pub ollama_url: String,
    pub ollama_timeout: Option<Duration>,
    pub lockout_delay: Duration,
    pub log_path: PathBuf,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Ollama,
            prompt_path: PathBuf::from(DEFAULT_PROMPT_PATH),
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback_models: DEFAULT_FALLBACK_MODELS.map(str::to_string).to_vec(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_timeout: None,
            lockout_delay: DEFAULT_LOCKOUT_DELAY,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Resolves configuration through `lookup`. Blank values count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let backend = match var(BACKEND_ENV_VAR) {
            Some(value) => BackendKind::parse(&value)?,
            None => defaults.backend,
        };

        let fallback_models = match var(FALLBACK_MODELS_ENV_VAR) {
            Some(value) => parse_model_list(&value),
            None => defaults.fallback_models,
        };

        let ollama_timeout = var(OLLAMA_TIMEOUT_ENV_VAR)
            .map(|value| parse_seconds(OLLAMA_TIMEOUT_ENV_VAR, &value))
            .transpose()?;

        let lockout_delay = match var(LOCKOUT_SECS_ENV_VAR) {
            Some(value) => parse_seconds(LOCKOUT_SECS_ENV_VAR, &value)?,
            None => defaults.lockout_delay,
        };

        Ok(Self {
            backend,
            prompt_path: var(PROMPT_PATH_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.prompt_path),
            primary_model: var(MODEL_ENV_VAR)
                .map(|value| value.trim().to_string())
                .unwrap_or(defaults.primary_model),
            fallback_models,
            ollama_url: var(OLLAMA_URL_ENV_VAR)
                .map(|value| value.trim().to_string())
                .unwrap_or(defaults.ollama_url),
            ollama_timeout,
            lockout_delay,
            log_path: var(LOG_PATH_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.log_path),
        })
    }
}

fn parse_model_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_seconds(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidSeconds {
            var,
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct PromptFile {
    prompt: String,
}

/// Reads `{"prompt": "..."}` from `path`.
pub fn load_system_prompt(path: &Path) -> Result<String, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::PromptRead {
        path: path.to_path_buf(),
        source,
    })?;
    let file: PromptFile =
        serde_json::from_str(&raw).map_err(|source| ConfigError::PromptParse {
            path: path.to_path_buf(),
            source,
        })?;

    let prompt = file.prompt.trim();
    if prompt.is_empty() {
        return Err(ConfigError::EmptyPrompt {
            path: path.to_path_buf(),
        });
    }

    Ok(prompt.to_string())
}

/// Loads the system prompt, degrading to [`DEFAULT_SYSTEM_PROMPT`].
pub fn resolve_system_prompt(path: &Path) -> String {
    match load_system_prompt(path) {
        Ok(prompt) => {
            info!(path = %path.display(), "system prompt loaded");
            prompt
        }
        Err(error) => {
            warn!(%error, "using default system prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}
