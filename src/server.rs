//! HTTP API for the intake pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/analyze` | Aggregate the requested sources under the configured deadline |
//! | `POST` | `/extract?file_name=…` | Extract text from the raw request body |
//! | `GET`  | `/prefill/{owner_id}/{entity}` | Current field values |
//! | `POST` | `/prefill/{owner_id}/{entity}` | Apply proposals without overwriting filled fields |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "nothing_analyzable", "message": "nothing analyzable: every requested source failed (website)" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unsupported_type` (415),
//! `nothing_analyzable` (422), `extraction_failed` (422), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the onboarding front
//! end can call the API directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use intake_harness_core::error::ExtractError;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::aggregate::{AggregateReport, AggregateRequest, Aggregator};
use crate::config::Config;
use crate::error::AggregateError;
use crate::extract::{extract_document, DocumentText};
use crate::models::{PrefillEntity, PrefillField};
use crate::prefill_store::{apply_prefill, load_fields};

/// Uploaded documents are small office files; this covers a long PDF.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    aggregator: Arc<Aggregator>,
}

/// Build the router over an already migrated pool.
pub fn build_router(config: &Config, pool: SqlitePool) -> anyhow::Result<Router> {
    let aggregator = Aggregator::from_config(config, pool.clone())?;
    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        aggregator: Arc::new(aggregator),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/analyze", post(handle_analyze))
        .route("/extract", post(handle_extract))
        .route(
            "/prefill/{owner_id}/{entity}",
            get(handle_get_prefill).post(handle_apply_prefill),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state))
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs until the process is terminated. The schema is created first so a
/// fresh data directory works without `intake init`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    crate::migrate::create_schema(&pool).await?;
    let app = build_router(config, pool)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "intake server listening");
    axum::serve(listener, app).await?;

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

struct AppError {
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(err: impl std::fmt::Display) -> AppError {
    error!(error = %err, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: err.to_string(),
    }
}

impl From<AggregateError> for AppError {
    fn from(err: AggregateError) -> Self {
        AppError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "nothing_analyzable",
            message: err.to_string(),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        let (status, code) = match &err {
            ExtractError::UnsupportedType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_type")
            }
            ExtractError::Zip(_) | ExtractError::Empty => {
                (StatusCode::UNPROCESSABLE_ENTITY, "extraction_failed")
            }
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

// ============ POST /analyze ============

#[derive(Serialize)]
struct AnalyzeResponse {
    #[serde(flatten)]
    report: AggregateReport,
    /// Labeled blocks ready for the prompt builder.
    context: String,
}

async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AggregateRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if request.requested_sources().is_empty() {
        return Err(bad_request("at least one source must be provided"));
    }

    // Dropped with the request, which cancels every source still running.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let report = state
        .aggregator
        .aggregate(&request, state.config.budget.deadline(), &cancel)
        .await?;
    let context = report.to_context();
    Ok(Json(AnalyzeResponse { report, context }))
}

// ============ POST /extract ============

#[derive(Deserialize)]
struct ExtractQuery {
    file_name: String,
}

async fn handle_extract(
    Query(query): Query<ExtractQuery>,
    body: Bytes,
) -> Result<Json<DocumentText>, AppError> {
    if query.file_name.trim().is_empty() {
        return Err(bad_request("file_name must not be empty"));
    }

    let doc = tokio::task::spawn_blocking(move || extract_document(&query.file_name, &body))
        .await
        .map_err(internal)??;
    Ok(Json(doc))
}

// ============ /prefill/{owner_id}/{entity} ============

fn parse_entity(entity: &str) -> Result<PrefillEntity, AppError> {
    entity.parse().map_err(|e: String| bad_request(e))
}

#[derive(Serialize)]
struct ApplyPrefillResponse {
    filled: Vec<String>,
}

async fn handle_apply_prefill(
    State(state): State<AppState>,
    Path((owner_id, entity)): Path<(String, String)>,
    Json(proposals): Json<Vec<PrefillField>>,
) -> Result<Json<ApplyPrefillResponse>, AppError> {
    let entity = parse_entity(&entity)?;
    let filled = apply_prefill(&state.pool, &owner_id, entity, &proposals)
        .await
        .map_err(internal)?;
    Ok(Json(ApplyPrefillResponse { filled }))
}

async fn handle_get_prefill(
    State(state): State<AppState>,
    Path((owner_id, entity)): Path<(String, String)>,
) -> Result<Json<BTreeMap<String, Option<String>>>, AppError> {
    let entity = parse_entity(&entity)?;
    let fields = load_fields(&state.pool, &owner_id, entity)
        .await
        .map_err(internal)?;
    Ok(Json(fields))
}
