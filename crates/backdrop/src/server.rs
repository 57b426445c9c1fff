//! HTTP boundary for background replacement.
//!
//! Exposes the replacer as `POST /api/replace-background` plus a health
//! endpoint. Every request to the boundary produces the JSON contract, even
//! when the body cannot be parsed.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use backdrop_core::{
    BackgroundReplacer, BoundaryResponse, ErrorKind, ReplaceBackgroundRequest, ResponseBody,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

/// Shared application state for the boundary server.
#[derive(Clone)]
pub struct AppState {
    replacer: Arc<BackgroundReplacer>,
    /// Bounds in-flight replacements; extra requests queue for a permit.
    permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(replacer: Arc<BackgroundReplacer>, max_concurrent: usize) -> Self {
        Self {
            replacer,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Wrapper that sends a [`BoundaryResponse`] with its own status code.
struct BoundaryReply(BoundaryResponse);

impl IntoResponse for BoundaryReply {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.body)).into_response()
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState, max_body_mb: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/replace-background", post(replace_background_handler))
        .layer(DefaultBodyLimit::max(max_body_mb * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: backdrop_core::VERSION.to_string(),
    })
}

/// POST /api/replace-background
///
/// Buffers and parses the body itself so oversized or malformed bodies are
/// answered in the boundary failure shape rather than axum's plain-text
/// rejection.
async fn replace_background_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> BoundaryReply {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!("Rejecting unreadable request body: {}", rejection.body_text());
            return BoundaryReply(invalid_body(rejection.body_text()));
        }
    };

    let request: ReplaceBackgroundRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejecting malformed request body: {e}");
            return BoundaryReply(invalid_body(e));
        }
    };

    let _permit = match state.permits.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return BoundaryReply(BoundaryResponse {
                status: ErrorKind::ServiceUnavailable.http_status(),
                body: ResponseBody::Failure {
                    error: "Server is shutting down".to_string(),
                    code: ErrorKind::ServiceUnavailable,
                    processing_time: 0,
                },
            })
        }
    };

    BoundaryReply(state.replacer.replace(request).await)
}

fn invalid_body(error: impl std::fmt::Display) -> BoundaryResponse {
    BoundaryResponse {
        status: ErrorKind::Validation.http_status(),
        body: ResponseBody::Failure {
            error: format!("Invalid request body: {error}"),
            code: ErrorKind::Validation,
            processing_time: 0,
        },
    }
}

/// Bind and serve until the process is stopped.
pub async fn run(state: AppState, addr: &str, max_body_mb: usize) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state, max_body_mb)).await?;
    Ok(())
}
