//! Google generative-language provider (`models/{model}:generateContent`).
//!
//! Wire types are private; [`decode_generate_content`] is the only place that
//! knows the response shape, so it can be tested without a network.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::status_error;
use crate::llm::ProviderError;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiProvider {
    /// `api_base_url` is the versioned API root, e.g.
    /// `https://generativelanguage.googleapis.com/v1`. The key, when present,
    /// is sent in the `x-goog-api-key` header so it never appears in a URL.
    pub fn new(
        api_base_url: String,
        model: String,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Build(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, api_key })
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.api_base_url.trim_end_matches('/'), self.model)
    }

    /// Lightweight reachability check: any HTTP response counts as reachable.
    pub async fn ping(&self) -> Result<(), ProviderError> {
        let mut req = self.client.get(self.model_url()).timeout(std::time::Duration::from_secs(5));
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }
        req.send()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Transport(format!("unreachable: {}", e.without_url())))
    }

    /// One `generateContent` round-trip for `prompt`.
    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let payload = GenerateContentRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "sending gemini request");

        let mut req = self
            .client
            .post(format!("{}:generateContent", self.model_url()))
            .json(&payload);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }

        let response = req.send().await.map_err(|e| {
            let e = e.without_url();
            error!(model = %self.model, error = %e, "gemini HTTP request failed (transport)");
            ProviderError::Transport(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                ProviderError::Transport(format!("failed to read response body: {}", e.without_url()))
            })?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        decode_generate_content(&body)
    }
}

/// Decode a `generateContent` response body into the answer text.
///
/// Text parts of the first candidate are concatenated. A response with no
/// candidates (e.g. a blocked prompt) or only blank text is
/// [`ProviderError::EmptyCompletion`].
pub fn decode_generate_content(body: &[u8]) -> Result<String, ProviderError> {
    let parsed: GenerateContentResponse = serde_json::from_slice(body).map_err(|e| {
        error!(error = %e, "failed to deserialize gemini response");
        ProviderError::Decode(e.to_string())
    })?;

    if let Some(reason) = parsed.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
        warn!(block_reason = reason, "gemini blocked the prompt");
    }

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::EmptyCompletion);
    }
    Ok(text.to_string())
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
