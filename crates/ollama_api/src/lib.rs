//! Transport-only Ollama HTTP client primitives.
//!
//! This crate owns request building, response decoding, and status/error
//! mapping for the Ollama `/api/chat` and `/api/tags` endpoints. It has no
//! knowledge of conversation state or fallback policy.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod url;

pub use client::OllamaClient;
pub use config::OllamaConfig;
pub use error::OllamaApiError;
pub use payload::{ChatRequest, ChatResponse, ModelTag, WireMessage};
pub use url::normalize_base_url;
