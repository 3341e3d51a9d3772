//! Axum handlers.
//!
//! `POST /getAnswers` checks run in a fixed order: bearer identity, profile
//! lookup, body decoding, question extraction. The first failure answers the
//! request; nothing is sent to the completion backend until all of them pass.
//!
//! `POST /updatesentence` merges the given profile fields into the caller's
//! stored profile, creating it on first use.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::error::ApiError;
use crate::context::AppContext;
use crate::deadline::Deadline;
use crate::extract::extract_questions;
use crate::pipeline::{self, Answer, AnswerStatus};
use crate::profile::{ProfileError, ProfileUpdate, UserProfile};

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AnswersRequest {
    html: String,
}

#[derive(Serialize)]
struct AnswerBody<'a> {
    question: &'a str,
    answer: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<AnswerStatus>,
}

impl<'a> AnswerBody<'a> {
    fn from_answer(a: &'a Answer, expose_status: bool) -> Self {
        Self {
            question: &a.question,
            answer: &a.answer,
            status: expose_status.then_some(a.status),
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /getAnswers
pub(super) async fn get_answers(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("get_answers", %request_id);

    async move {
        let started = Instant::now();
        match answer(&ctx, &headers, &body).await {
            Ok(resp) => {
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "request answered");
                resp
            }
            Err(e) => reject(e),
        }
    }
    .instrument(span)
    .await
}

fn reject(e: ApiError) -> Response {
    match &e {
        ApiError::ProfileLookup(_) | ApiError::ProfileUpdate(_) => {
            error!(error = %e, "request rejected")
        }
        _ => warn!(code = e.code(), error = %e, "request rejected"),
    }
    e.into_response()
}

async fn answer(ctx: &AppContext, headers: &HeaderMap, body: &[u8]) -> Result<Response, ApiError> {
    let subject = ctx.tokens.subject(headers)?;
    debug!(%subject, "caller authenticated");

    let profile = ctx.profiles.get(&subject).await?;

    let req: AnswersRequest =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedRequest(e.to_string()))?;

    let questions = extract_questions(&req.html);
    if questions.is_empty() {
        return Err(ApiError::NoQuestionsFound);
    }
    info!(questions = questions.len(), html_len = req.html.len(), "extracted form questions");

    let answers = pipeline::answer_questions(
        questions,
        Arc::new(profile),
        &ctx.completion,
        Arc::clone(&ctx.limiter),
        Deadline::after(ctx.pipeline.deadline),
    )
    .await;

    let expose = ctx.pipeline.expose_status;
    let body: Vec<AnswerBody<'_>> =
        answers.iter().map(|a| AnswerBody::from_answer(a, expose)).collect();
    Ok(Json(body).into_response())
}

/// POST /updatesentence
pub(super) async fn update_profile(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("update_profile", %request_id);

    async move {
        match store_profile(&ctx, &headers, &body).await {
            Ok(resp) => resp,
            Err(e) => reject(e),
        }
    }
    .instrument(span)
    .await
}

async fn store_profile(ctx: &AppContext, headers: &HeaderMap, body: &[u8]) -> Result<Response, ApiError> {
    let subject = ctx.tokens.subject(headers)?;

    let update: ProfileUpdate =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedRequest(e.to_string()))?;
    if update.is_empty() {
        return Err(ApiError::MalformedRequest(
            "expected at least one of bio, experience, projects".into(),
        ));
    }

    let mut profile = match ctx.profiles.get(&subject).await {
        Ok(p) => p,
        Err(ProfileError::NotFound(_)) => UserProfile::default(),
        Err(e) => return Err(ApiError::ProfileLookup(e)),
    };
    update.apply(&mut profile);

    ctx.profiles.put(&subject, profile.clone()).await.map_err(ApiError::ProfileUpdate)?;
    info!(%subject, "profile updated");

    Ok(Json(profile).into_response())
}

/// OPTIONS preflight, answered before any credential check.
pub(super) async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// GET /health
pub(super) async fn health(State(ctx): State<Arc<AppContext>>) -> Response {
    let provider = ctx.completion.provider_name();
    match tokio::time::timeout(Duration::from_secs(5), ctx.completion.ping()).await {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "provider": provider, "model": ctx.model })),
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!(provider, error = %e, "provider ping failed");
            unavailable(provider, &ctx.model, e.to_string())
        }
        Err(_) => {
            warn!(provider, "provider ping timed out");
            unavailable(provider, &ctx.model, "ping timed out".to_string())
        }
    }
}

fn unavailable(provider: &str, model: &str, message: String) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "status": "unavailable",
            "provider": provider,
            "model": model,
            "message": message,
        })),
    )
        .into_response()
}
