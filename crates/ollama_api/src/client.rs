use reqwest::Client;

use crate::config::OllamaConfig;
use crate::error::{chat_status_error, parse_error_message, OllamaApiError};
use crate::payload::{ChatRequest, ChatResponse, ModelTag, TagsResponse};
use crate::url::{chat_url, normalize_base_url, tags_url};

#[derive(Debug)]
pub struct OllamaClient {
    http: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, OllamaApiError> {
        let base = normalize_base_url(&config.base_url);
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(OllamaApiError::InvalidBaseUrl(config.base_url));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OllamaApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    pub fn chat_endpoint(&self) -> String {
        chat_url(&self.config.base_url)
    }

    pub fn tags_endpoint(&self) -> String {
        tags_url(&self.config.base_url)
    }

    pub fn build_chat_request(&self, request: &ChatRequest) -> reqwest::RequestBuilder {
        let mut payload = request.clone();
        payload.stream = false;
        self.http.post(self.chat_endpoint()).json(&payload)
    }

    /// Sends one non-streaming chat request and decodes the reply.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, OllamaApiError> {
        let response = self.build_chat_request(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(chat_status_error(status, &body, &request.model));
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Lists installed models.
    pub async fn list_models(&self) -> Result<Vec<ModelTag>, OllamaApiError> {
        let response = self.http.get(self.tags_endpoint()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OllamaApiError::Status(
                status,
                parse_error_message(status, &body),
            ));
        }

        let tags: TagsResponse = serde_json::from_str(&body)?;
        Ok(tags.models)
    }
}
