/// Default base URL of a local Ollama daemon.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Normalize a base URL to the daemon root.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_OLLAMA_BASE_URL`]
/// 2) trailing slashes are removed
/// 3) a trailing `/api` segment is removed so endpoints are not doubled
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_OLLAMA_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/api").unwrap_or(trimmed);
    trimmed.trim_end_matches('/').to_string()
}

/// Chat completion endpoint for `base`.
pub fn chat_url(base: &str) -> String {
    format!("{}/api/chat", normalize_base_url(base))
}

/// Installed-model listing endpoint for `base`.
pub fn tags_url(base: &str) -> String {
    format!("{}/api/tags", normalize_base_url(base))
}
