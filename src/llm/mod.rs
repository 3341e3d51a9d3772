//! LLM provider abstraction.
//!
//! Two layers:
//!
//! - [`CompletionService`]: the capability the pipeline consumes: one prompt
//!   in, canonical text out. Object safe so tests can plug in stubs behind
//!   `Arc<dyn CompletionService>`.
//! - [`LlmProvider`]: enum over the concrete backends in `providers/`.
//!   Each backend keeps its wire types private and decodes into plain text.
//!
//! [`client::CompletionClient`] wraps a service with deadline handling.

pub mod client;
pub mod providers;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use client::CompletionClient;

// ── Error ─────────────────────────────────────────────────────────────────────

/// Why a completion produced no text. The pipeline treats every variant as
/// "empty answer"; the distinction exists for logs.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider setup failed: {0}")]
    Build(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("provider returned an empty completion")]
    EmptyCompletion,
    #[error("undecodable provider response: {0}")]
    Decode(String),
    #[error("deadline exceeded before the provider answered")]
    DeadlineExceeded,
}

impl ProviderError {
    /// Short stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::UnknownProvider(_) => "unknown_provider",
            ProviderError::Build(_) => "build",
            ProviderError::Transport(_) => "transport",
            ProviderError::Status { .. } => "status",
            ProviderError::EmptyCompletion => "empty",
            ProviderError::Decode(_) => "decode",
            ProviderError::DeadlineExceeded => "deadline",
        }
    }
}

// ── Capability ────────────────────────────────────────────────────────────────

/// Boxed future returned by [`CompletionService::complete`].
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>>;

/// Boxed future returned by [`CompletionService::ping`].
pub type PingFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ProviderError>> + Send + 'a>>;

/// A text-completion backend. One call to `complete` issues at most one
/// outbound request; there is no retry.
pub trait CompletionService: Send + Sync + 'static {
    /// Stable identifier used in logs and `/health`.
    fn name(&self) -> &str;

    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a>;

    /// Reachability check. Backends without a network endpoint are always up.
    fn ping(&self) -> PingFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Adding a backend = new module + new variant + new match arms.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    Gemini(providers::gemini::GeminiProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
}

impl CompletionService for LlmProvider {
    fn name(&self) -> &str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::Gemini(_) => "gemini",
            LlmProvider::OpenAiCompatible(_) => "openai",
        }
    }

    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a> {
        match self {
            LlmProvider::Dummy(p) => Box::pin(p.complete(prompt)),
            LlmProvider::Gemini(p) => Box::pin(p.complete(prompt)),
            LlmProvider::OpenAiCompatible(p) => Box::pin(p.complete(prompt)),
        }
    }

    fn ping(&self) -> PingFuture<'_> {
        match self {
            LlmProvider::Dummy(_) => Box::pin(async { Ok(()) }),
            LlmProvider::Gemini(p) => Box::pin(p.ping()),
            LlmProvider::OpenAiCompatible(p) => Box::pin(p.ping()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_distinct() {
        let errors = [
            ProviderError::Transport("connection refused".into()),
            ProviderError::Status { status: 503, message: "overloaded".into() },
            ProviderError::EmptyCompletion,
            ProviderError::Decode("expected value".into()),
            ProviderError::DeadlineExceeded,
        ];
        let kinds: std::collections::HashSet<_> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn status_error_display() {
        let e = ProviderError::Status { status: 429, message: "quota exhausted".into() };
        assert_eq!(e.to_string(), "provider returned HTTP 429: quota exhausted");
    }

    #[tokio::test]
    async fn dummy_variant_dispatches() {
        let p = LlmProvider::Dummy(providers::dummy::DummyProvider);
        assert_eq!(p.name(), "dummy");
        assert!(p.ping().await.is_ok());
        assert_eq!(p.complete("context\nName?").await.unwrap(), "[echo] Name?");
    }
}
