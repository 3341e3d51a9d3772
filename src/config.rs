//! Configuration loading with env-var overrides.
//!
//! Reads a TOML file (default `config/default.toml`), resolves it into the
//! public structs below, then applies `FORMFILL_BIND` and
//! `FORMFILL_LOG_LEVEL` overrides. Secrets (`LLM_API_KEY`,
//! `AUTH_JWT_SECRET`) are only ever read from the environment.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::AppError;

/// Google generative-language provider configuration (`[llm.gemini]`).
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1`.
    pub api_base_url: String,
    /// Model name inserted into the `models/{model}:generateContent` path.
    pub model: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// OpenAI / OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"`, `"gemini"`, `"openai"`).
    /// Maps to `default` in `[llm]` so other provider sections can coexist.
    pub provider: String,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
}

impl LlmConfig {
    /// Model name of the active provider, for logs and `/health`.
    pub fn active_model(&self) -> &str {
        match self.provider.as_str() {
            "gemini" => &self.gemini.model,
            "openai" | "openai-compatible" => &self.openai.model,
            _ => "dummy",
        }
    }
}

/// Fan-out pipeline tuning (`[pipeline]`).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Shared deadline for every completion call of one request.
    pub deadline: Duration,
    /// Upper bound on in-flight completion calls across the process.
    pub max_concurrency: usize,
    /// Add a per-answer `status` field to the `/getAnswers` response.
    pub expose_status: bool,
}

/// Bearer token verification (`[auth]`). The HS256 secret comes from
/// `AUTH_JWT_SECRET`.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// Where user profiles are read from (`[profiles]`).
#[derive(Debug, Clone)]
pub struct ProfilesConfig {
    /// `"sqlite"` or `"memory"`.
    pub backend: String,
    /// SQLite database file (already expanded, no `~`).
    pub path: PathBuf,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP server binds to.
    pub bind: String,
    pub log_level: String,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub auth: AuthConfig,
    pub profiles: ProfilesConfig,
    /// From `LLM_API_KEY`; `None` for keyless local models.
    pub llm_api_key: Option<String>,
    /// From `AUTH_JWT_SECRET`.
    pub auth_secret: Option<String>,
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    pipeline: RawPipeline,
    #[serde(default)]
    auth: RawAuth,
    #[serde(default)]
    profiles: RawProfiles,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawServer {
    fn default() -> Self {
        Self { bind: default_bind(), log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    gemini: RawGeminiConfig,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            gemini: RawGeminiConfig::default(),
            openai: RawOpenAiConfig::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawGeminiConfig {
    #[serde(default = "default_gemini_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_gemini_model")]
    model: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawGeminiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_gemini_api_base_url(),
            model: default_gemini_model(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawPipeline {
    #[serde(default = "default_deadline_seconds")]
    deadline_seconds: u64,
    #[serde(default = "default_max_concurrency")]
    max_concurrency: usize,
    #[serde(default)]
    expose_status: bool,
}

impl Default for RawPipeline {
    fn default() -> Self {
        Self {
            deadline_seconds: default_deadline_seconds(),
            max_concurrency: default_max_concurrency(),
            expose_status: false,
        }
    }
}

#[derive(Deserialize, Default)]
struct RawAuth {
    #[serde(default)]
    issuer: Option<String>,
    #[serde(default)]
    audience: Option<String>,
}

#[derive(Deserialize)]
struct RawProfiles {
    #[serde(default = "default_profiles_backend")]
    backend: String,
    #[serde(default = "default_profiles_path")]
    path: String,
}

impl Default for RawProfiles {
    fn default() -> Self {
        Self { backend: default_profiles_backend(), path: default_profiles_path() }
    }
}

fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_llm_provider() -> String { "dummy".to_string() }
fn default_gemini_api_base_url() -> String { "https://generativelanguage.googleapis.com/v1".to_string() }
fn default_gemini_model() -> String { "gemini-1.5-flash".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_timeout_seconds() -> u64 { 60 }
fn default_deadline_seconds() -> u64 { 30 }
fn default_max_concurrency() -> usize { 16 }
fn default_profiles_backend() -> String { "sqlite".to_string() }
fn default_profiles_path() -> String { "~/.formfill/profiles.db".to_string() }

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from `config_path`, or `config/default.toml`, then apply
/// env-var overrides. With no explicit path and no default file present the
/// built-in defaults are used.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let bind_override = env::var("FORMFILL_BIND").ok();
    let log_level_override = env::var("FORMFILL_LOG_LEVEL").ok();

    if let Some(path) = config_path {
        return load_from(Path::new(path), bind_override.as_deref(), log_level_override.as_deref());
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(default_path, bind_override.as_deref(), log_level_override.as_deref())
    } else {
        resolve(RawConfig::default(), bind_override.as_deref(), log_level_override.as_deref())
    }
}

/// Internal loader. Accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    bind_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, bind_override, log_level_override)
}

fn resolve(
    parsed: RawConfig,
    bind_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let p = parsed.pipeline;
    if p.deadline_seconds == 0 {
        return Err(AppError::Config("pipeline.deadline_seconds must be at least 1".into()));
    }
    if p.max_concurrency == 0 {
        return Err(AppError::Config("pipeline.max_concurrency must be at least 1".into()));
    }

    Ok(Config {
        bind: bind_override.unwrap_or(&parsed.server.bind).to_string(),
        log_level: log_level_override.unwrap_or(&parsed.server.log_level).to_string(),
        llm: LlmConfig {
            provider: parsed.llm.provider,
            gemini: GeminiConfig {
                api_base_url: parsed.llm.gemini.api_base_url,
                model: parsed.llm.gemini.model,
                timeout_seconds: parsed.llm.gemini.timeout_seconds,
            },
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        pipeline: PipelineConfig {
            deadline: Duration::from_secs(p.deadline_seconds),
            max_concurrency: p.max_concurrency,
            expose_status: p.expose_status,
        },
        auth: AuthConfig {
            issuer: parsed.auth.issuer,
            audience: parsed.auth.audience,
        },
        profiles: ProfilesConfig {
            backend: parsed.profiles.backend,
            path: expand_home(&parsed.profiles.path),
        },
        llm_api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
        auth_secret: env::var("AUTH_JWT_SECRET").ok().filter(|k| !k.is_empty()),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
