//! Deadline-aware front for a [`CompletionService`].

use std::sync::Arc;

use tracing::debug;

use super::{CompletionService, ProviderError};
use crate::deadline::Deadline;

/// Shared handle to the configured completion backend. Cloning is cheap.
#[derive(Clone)]
pub struct CompletionClient {
    service: Arc<dyn CompletionService>,
}

impl CompletionClient {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    pub fn provider_name(&self) -> &str {
        self.service.name()
    }

    /// Complete `prompt`, giving up when `deadline` fires.
    ///
    /// An already-expired deadline returns [`ProviderError::DeadlineExceeded`]
    /// without calling the backend. When the deadline wins the race the
    /// in-flight request future is dropped, which cancels it.
    pub async fn complete(&self, deadline: &Deadline, prompt: &str) -> Result<String, ProviderError> {
        if deadline.is_expired() {
            return Err(ProviderError::DeadlineExceeded);
        }

        let text = tokio::select! {
            biased;
            _ = deadline.expired() => {
                debug!(provider = self.service.name(), "completion abandoned at deadline");
                return Err(ProviderError::DeadlineExceeded);
            }
            result = self.service.complete(prompt) => result?,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }
        Ok(text.to_string())
    }

    pub async fn ping(&self) -> Result<(), ProviderError> {
        self.service.ping().await
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient").field("provider", &self.service.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::llm::CompletionFuture;

    struct Stub {
        reply: &'static str,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Stub {
        fn new(reply: &'static str, delay: Duration) -> Arc<Self> {
            Arc::new(Self { reply, delay, calls: AtomicUsize::new(0) })
        }
    }

    impl CompletionService for Stub {
        fn name(&self) -> &str {
            "stub"
        }

        fn complete<'a>(&'a self, _prompt: &'a str) -> CompletionFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                Ok(self.reply.to_string())
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_trimmed_text() {
        let stub = Stub::new("  Jane Doe \n", Duration::from_millis(10));
        let client = CompletionClient::new(stub.clone());
        let deadline = Deadline::after(Duration::from_secs(1));
        assert_eq!(client.complete(&deadline, "Name?").await.unwrap(), "Jane Doe");
        assert_eq!(client.provider_name(), "stub");
    }

    #[tokio::test(start_paused = true)]
    async fn blank_text_is_empty_completion() {
        let client = CompletionClient::new(Stub::new(" \n ", Duration::ZERO));
        let deadline = Deadline::after(Duration::from_secs(1));
        assert!(matches!(
            client.complete(&deadline, "Name?").await,
            Err(ProviderError::EmptyCompletion)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_hits_deadline() {
        let stub = Stub::new("late", Duration::from_secs(10));
        let client = CompletionClient::new(stub.clone());
        let deadline = Deadline::after(Duration::from_secs(2));
        let start = tokio::time::Instant::now();

        let result = client.complete(&deadline, "Why?").await;

        assert!(matches!(result, Err(ProviderError::DeadlineExceeded)));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_skips_backend() {
        let stub = Stub::new("unused", Duration::ZERO);
        let client = CompletionClient::new(stub.clone());
        let deadline = Deadline::after(Duration::from_secs(1));
        deadline.cancel();

        assert!(matches!(
            client.complete(&deadline, "Why?").await,
            Err(ProviderError::DeadlineExceeded)
        ));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }
}
