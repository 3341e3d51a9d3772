//! Application-wide error types.
//!
//! Request-level errors live in [`crate::server::ApiError`]; provider errors
//! in [`crate::llm::ProviderError`]. This enum covers startup and wiring.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("server error: {0}")]
    Server(String),
}
