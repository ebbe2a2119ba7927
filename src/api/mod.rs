// HTTP API
// axum routes for the rewrite and score operations:
// - POST /api/humanize  {text} -> {success, humanized_text}
// - POST /api/score     {text} -> {success, ai_probability, scores}
// - GET  /health

use crate::models::{required_text, ErrorResponse, RewriteRequest, RewriteResponse, ScoreRequest, ScoreResponse};
use crate::services::provenance::ClientFingerprint;
use crate::services::rewrite::GenerationError;
use crate::services::Humanizer;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const HUMANIZED_HEADER: &str = "x-humanized";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

pub struct AppState {
    pub humanizer: Humanizer,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/humanize", post(humanize))
        .route("/api/score", post(score))
        .route("/health", get(health))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    request_id = %uuid::Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Text input is required.")]
    InvalidInput,
    /// Details are logged, never returned.
    #[error("internal_error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidInput => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        error!("[API] rewrite failed: {}", e);
        ApiError::Internal
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        warn!("[API] rejected body: {}", e);
        ApiError::InvalidInput
    }
}

// ============================================================================
// Extractors
// ============================================================================

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Caller fingerprint from forwarding headers, peer address and user agent.
pub struct ClientIdentity(pub ClientFingerprint);

impl<S: Send + Sync> FromRequestParts<S> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ClientIdentity(ClientFingerprint::from_parts(
            header_value(parts, FORWARDED_FOR_HEADER),
            peer,
            header_value(parts, header::USER_AGENT.as_str()),
        )))
    }
}

/// `X-Humanized: 1` (or `true`) declares the text as humanized output.
pub struct DeclaredHumanized(pub bool);

impl<S: Send + Sync> FromRequestParts<S> for DeclaredHumanized {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let declared = header_value(parts, HUMANIZED_HEADER)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true"))
            .unwrap_or(false);
        Ok(DeclaredHumanized(declared))
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn humanize(
    State(state): State<Arc<AppState>>,
    ClientIdentity(client): ClientIdentity,
    body: Result<Json<RewriteRequest>, JsonRejection>,
) -> Result<Json<RewriteResponse>, ApiError> {
    let Json(request) = body?;
    let text = required_text(request.text.as_deref()).ok_or(ApiError::InvalidInput)?;

    info!("[API] humanize chars={}", text.chars().count());
    let mut rng = StdRng::from_os_rng();
    let response = state.humanizer.rewrite(text, &client, &mut rng).await?;
    Ok(Json(response))
}

async fn score(
    State(state): State<Arc<AppState>>,
    ClientIdentity(client): ClientIdentity,
    DeclaredHumanized(declared): DeclaredHumanized,
    body: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let Json(request) = body?;
    let text = required_text(request.text.as_deref()).ok_or(ApiError::InvalidInput)?;

    info!("[API] score chars={} declared={}", text.chars().count(), declared);
    let mut rng = StdRng::from_os_rng();
    let response = state.humanizer.score(text, &client, declared, &mut rng).await;
    Ok(Json(response))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
