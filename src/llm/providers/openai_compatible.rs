//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Covers OpenAI itself, managed model runtimes and gateways that expose the
//! same shape, and local servers (Ollama, LM Studio…). Each form question is
//! sent as a single user message; the provider is stateless.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use super::status_error;
use crate::llm::ProviderError;

/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>` on every request.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Build(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    /// Lightweight reachability check.
    ///
    /// Any HTTP response (including 4xx) means the server is reachable; only a
    /// transport-level failure counts as unreachable.
    pub async fn ping(&self) -> Result<(), ProviderError> {
        let mut req = self
            .client
            .head(&self.api_base_url)
            .timeout(std::time::Duration::from_secs(5));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req.send()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Transport(format!("unreachable: {}", e.without_url())))
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let payload = self.request_for(prompt);

        debug!(
            model = %payload.model,
            temperature = ?payload.temperature,
            prompt_len = prompt.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            let e = e.without_url();
            error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
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

        decode_chat_completion(&body)
    }

    fn request_for<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        // Some models (gpt-5 family) do not accept a temperature parameter.
        let temperature = if self.model.starts_with("gpt-5") {
            None
        } else {
            Some(self.temperature)
        };

        ChatCompletionRequest {
            model: &self.model,
            messages: vec![Message { role: "user", content: prompt }],
            temperature,
        }
    }
}

/// Decode a chat-completions response body into the first choice's text.
pub fn decode_chat_completion(body: &[u8]) -> Result<String, ProviderError> {
    let parsed: ChatCompletionResponse = serde_json::from_slice(body).map_err(|e| {
        error!(error = %e, "failed to deserialize LLM response");
        ProviderError::Decode(e.to_string())
    })?;

    debug!(choices = parsed.choices.len(), "received LLM response");

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ProviderError::EmptyCompletion)
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
