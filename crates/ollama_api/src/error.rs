use std::fmt;

use reqwest::StatusCode;
use serde_json::Error as JsonError;

use crate::payload::ErrorPayload;

#[derive(Debug)]
pub enum OllamaApiError {
    InvalidBaseUrl(String),
    Request(reqwest::Error),
    Timeout,
    Status(StatusCode, String),
    ModelNotFound(String),
    Decode(JsonError),
    Runtime(String),
}

impl OllamaApiError {
    /// Returns true when the daemon could not be reached at all.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Request(error) if error.is_connect())
    }
}

impl fmt::Display for OllamaApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::ModelNotFound(model) => write!(f, "model '{model}' not found"),
            Self::Decode(error) => write!(f, "response decode error: {error}"),
            Self::Runtime(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for OllamaApiError {}

impl From<reqwest::Error> for OllamaApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(error)
        }
    }
}

impl From<JsonError> for OllamaApiError {
    fn from(error: JsonError) -> Self {
        Self::Decode(error)
    }
}

/// Extracts a human-readable message from an error response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let explicit = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty());

    if let Some(message) = explicit {
        return message;
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.trim().to_string()
    }
}

/// Maps a non-success chat status to an error, recognizing missing models.
pub fn chat_status_error(status: StatusCode, body: &str, model: &str) -> OllamaApiError {
    let message = parse_error_message(status, body);
    if status == StatusCode::NOT_FOUND && message.contains("not found") {
        return OllamaApiError::ModelNotFound(model.to_string());
    }

    OllamaApiError::Status(status, message)
}
