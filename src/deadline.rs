//! Per-request completion deadline.
//!
//! One [`Deadline`] is created when a request enters the pipeline and cloned
//! into every task. It fires either when the instant passes or when the
//! aggregator cancels it, whichever comes first.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    token: CancellationToken,
}

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self { at: Instant::now() + budget, token: CancellationToken::new() }
    }

    /// Time left before expiry; zero once expired or cancelled.
    pub fn remaining(&self) -> Duration {
        if self.token.is_cancelled() {
            return Duration::ZERO;
        }
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.at
    }

    /// Expire early. Every clone observes the cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves when the deadline passes or is cancelled.
    pub async fn expired(&self) {
        tokio::select! {
            _ = tokio::time::sleep_until(self.at) => {}
            _ = self.token.cancelled() => {}
        }
    }
}
