//! HTTP front end.
//!
//! ```text
//! POST    /getAnswers   {"html": "..."} → [{"question", "answer"}, ...]
//! OPTIONS /getAnswers   preflight, 200
//! POST    /updatesentence {"bio"?, "experience"?, "projects"?} → stored profile
//! OPTIONS /updatesentence preflight, 200
//! GET     /health       provider reachability
//! ```
//!
//! Every response, errors included, carries permissive CORS headers.

mod api;
pub mod error;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, header},
    middleware,
    response::Response,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::context::AppContext;
use crate::error::AppError;

pub use error::ApiError;

// ── Server loop ───────────────────────────────────────────────────────────────

/// Bind `bind_addr` and serve until `shutdown` is cancelled.
pub async fn serve(
    ctx: Arc<AppContext>,
    bind_addr: &str,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let router = build_router(ctx);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "formfill listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("server error: {e}")))?;

    info!("formfill shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/getAnswers",     post(api::get_answers).options(api::preflight))
        .route("/updatesentence", post(api::update_profile).options(api::preflight))
        .route("/health",         get(api::health))
        .layer(middleware::map_response(cors))
        .with_state(ctx)
}

async fn cors(mut resp: Response) -> Response {
    let headers = resp.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST, OPTIONS"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    resp
}
