//! Process-wide dependencies, built once in `main` and shared by `Arc` with
//! the HTTP handlers.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::info;

use crate::auth::{JwtTokenResolver, TokenResolver};
use crate::config::{Config, PipelineConfig};
use crate::error::AppError;
use crate::llm::{self, CompletionClient, CompletionService};
use crate::profile::{InMemoryProfileStore, ProfileStore};

pub struct AppContext {
    pub tokens: Arc<dyn TokenResolver>,
    pub profiles: Arc<dyn ProfileStore>,
    pub completion: CompletionClient,
    /// Bounds in-flight completion calls across every request.
    pub limiter: Arc<Semaphore>,
    pub pipeline: PipelineConfig,
    /// Active model name, reported by `/health`.
    pub model: String,
}

impl AppContext {
    pub fn new(
        tokens: Arc<dyn TokenResolver>,
        profiles: Arc<dyn ProfileStore>,
        completion: Arc<dyn CompletionService>,
        pipeline: PipelineConfig,
        model: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            profiles,
            completion: CompletionClient::new(completion),
            limiter: Arc::new(Semaphore::new(pipeline.max_concurrency)),
            pipeline,
            model: model.into(),
        }
    }

    /// Wire the configured provider, token verifier and profile store.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let secret = config.auth_secret.as_deref().ok_or_else(|| {
            AppError::Config("AUTH_JWT_SECRET must be set to verify bearer tokens".into())
        })?;
        let tokens = JwtTokenResolver::hs256(
            secret.as_bytes(),
            config.auth.issuer.as_deref(),
            config.auth.audience.as_deref(),
        );

        let provider = llm::providers::build(&config.llm, config.llm_api_key.clone())
            .map_err(|e| AppError::Config(format!("llm: {e}")))?;

        let profiles = profile_store(config)?;

        info!(
            provider = provider_name(&config.llm.provider),
            model = config.llm.active_model(),
            profiles = %config.profiles.backend,
            max_concurrency = config.pipeline.max_concurrency,
            deadline_secs = config.pipeline.deadline.as_secs(),
            "application context ready"
        );

        Ok(Self::new(
            Arc::new(tokens),
            profiles,
            Arc::new(provider),
            config.pipeline.clone(),
            config.llm.active_model(),
        ))
    }
}

fn provider_name(provider: &str) -> &str {
    if provider == "openai-compatible" { "openai" } else { provider }
}

fn profile_store(config: &Config) -> Result<Arc<dyn ProfileStore>, AppError> {
    match config.profiles.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryProfileStore::new())),
        #[cfg(feature = "profile-sqlite")]
        "sqlite" => {
            let store = crate::profile::sqlite::SqliteProfileStore::open(&config.profiles.path)
                .map_err(|e| AppError::Config(format!("profiles: {e}")))?;
            Ok(Arc::new(store))
        }
        other => Err(AppError::Config(format!("unsupported profiles backend: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::config::{AuthConfig, GeminiConfig, LlmConfig, OpenAiConfig, ProfilesConfig};

    fn config(backend: &str, path: PathBuf, secret: Option<&str>) -> Config {
        Config {
            bind: "127.0.0.1:0".into(),
            log_level: "info".into(),
            llm: LlmConfig {
                provider: "dummy".into(),
                gemini: GeminiConfig {
                    api_base_url: "http://127.0.0.1:0/v1".into(),
                    model: "gemini-test".into(),
                    timeout_seconds: 1,
                },
                openai: OpenAiConfig {
                    api_base_url: "http://127.0.0.1:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            pipeline: PipelineConfig {
                deadline: Duration::from_secs(30),
                max_concurrency: 4,
                expose_status: false,
            },
            auth: AuthConfig::default(),
            profiles: ProfilesConfig { backend: backend.into(), path },
            llm_api_key: None,
            auth_secret: secret.map(str::to_string),
        }
    }

    #[test]
    fn builds_with_memory_profiles() {
        let ctx = AppContext::from_config(&config("memory", PathBuf::new(), Some("s3cret"))).unwrap();
        assert_eq!(ctx.completion.provider_name(), "dummy");
        assert_eq!(ctx.model, "dummy");
        assert_eq!(ctx.limiter.available_permits(), 4);
    }

    #[test]
    fn missing_secret_is_config_error() {
        let err = AppContext::from_config(&config("memory", PathBuf::new(), None)).err().unwrap();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("AUTH_JWT_SECRET")));
    }

    #[test]
    fn unknown_backend_is_config_error() {
        let err = AppContext::from_config(&config("redis", PathBuf::new(), Some("s"))).err().unwrap();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("redis")));
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let mut cfg = config("memory", PathBuf::new(), Some("s"));
        cfg.llm.provider = "bard".into();
        assert!(AppContext::from_config(&cfg).is_err());
    }

    #[cfg(feature = "profile-sqlite")]
    #[test]
    fn builds_with_sqlite_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profiles.db");
        let ctx = AppContext::from_config(&config("sqlite", path.clone(), Some("s"))).unwrap();
        assert!(path.exists());
        assert_eq!(ctx.pipeline.max_concurrency, 4);
    }
}
