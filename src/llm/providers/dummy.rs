//! Dummy LLM provider. Echoes the question line back prefixed with `[echo]`.
//! Used to exercise the whole request path without an API key.

use crate::llm::ProviderError;

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    /// The composed prompt ends with the question, so the last line is echoed.
    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let question = prompt.lines().last().unwrap_or_default().trim();
        Ok(format!("[echo] {question}"))
    }
}
