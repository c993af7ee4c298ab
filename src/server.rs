//! HTTP query API.
//!
//! Exposes the retrieval engine over a small JSON API:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/newsletter-context` | Query the corpus (`user_query`, `days`, `max_results`) |
//! | `GET` | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "user_query must not be empty" } }
//! ```
//!
//! Status classes: `400` parameter validation, `404` unknown route, `429`
//! admission denied, `500` embedding or index failure. Rate limiting is
//! keyed by the `x-api-key` header when present, otherwise the client IP.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the API is read-only
//! and idempotent.

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::embedding;
use crate::engine::RetrievalEngine;
use crate::error::RetrievalError;
use crate::limiter::AdmissionController;
use crate::models::{ContextQuery, ContextResponse};
use crate::store::ChunkStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RetrievalEngine>,
    /// `days` applied when the request omits the parameter.
    pub default_days: i64,
    /// `max_results` applied when the request omits the parameter.
    pub default_max_results: usize,
}

/// Build the API router for the given state.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/newsletter-context", get(handle_context))
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured bind address with a store
/// populated from the optional ingest file.
pub async fn run_server(config: &Config, store: Arc<ChunkStore>) -> anyhow::Result<()> {
    let embedder: Arc<dyn embedding::QueryEmbedder> =
        Arc::from(embedding::create_embedder(&config.embedding)?);
    let limiter = Arc::new(AdmissionController::new(&config.rate_limit));
    let engine = Arc::new(RetrievalEngine::new(
        store,
        embedder,
        limiter,
        Duration::from_millis(config.retrieval.retry_backoff_ms),
    ));

    let state = AppState {
        engine,
        default_days: config.retrieval.default_days,
        default_max_results: config.retrieval.default_max_results,
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "newsletter-context API listening");
    println!("Running server on http://{}", config.server.bind);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
#[derive(Debug)]
pub(crate) struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        let (status, code) = match &err {
            RetrievalError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            RetrievalError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            RetrievalError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            RetrievalError::EmbeddingUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedding_unavailable")
            }
            RetrievalError::IndexUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "index_unavailable")
            }
            RetrievalError::DuplicateId(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/newsletter-context ============

// Numeric parameters arrive as raw strings and are parsed by hand so that
// `days=abc` produces the JSON error envelope rather than the extractor's
// plain-text rejection.
#[derive(Debug, Deserialize)]
struct ContextParams {
    user_query: Option<String>,
    days: Option<String>,
    max_results: Option<String>,
}

fn bad_request(message: String) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message,
    }
}

fn parse_param<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, AppError> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| bad_request(format!("Invalid value for {}: {}", name, raw))),
        None => Ok(default),
    }
}

async fn handle_context(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<ContextParams>,
) -> Result<Json<ContextResponse>, AppError> {
    let user_query = params
        .user_query
        .ok_or_else(|| bad_request("Missing required parameter: user_query".to_string()))?;

    let query = ContextQuery {
        user_query,
        days: parse_param("days", params.days, state.default_days)?,
        max_results: parse_param("max_results", params.max_results, state.default_max_results)?,
    };

    let caller_id = caller_identity(&headers, addr);
    let response = state.engine.query(&caller_id, &query).await?;
    Ok(Json(response))
}

/// API key when the caller sends one, else the peer IP.
fn caller_identity(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|key| format!("key:{}", key))
        .unwrap_or_else(|| addr.ip().to_string())
}

// ============ Fallback ============

async fn handle_not_found() -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: "Endpoint not found".to_string(),
    }
}
