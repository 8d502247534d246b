//! HTTP surface for docsum.
//!
//! - `POST /summarize-text/` – Multipart upload (field `file`). Extracts, chunks and summarizes the
//!   document and returns `{"summary": "..."}`. Failures return `{"error": "..."}`, plus
//!   `raw_response` when the summarization service replied with an unexpected body.
//! - `GET /metrics` – Summarization counters.
//! - `GET /health` – Liveness probe.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools.
//!
//! Failures are reported with `200 OK` and an `error` field unless strict status codes are
//! enabled, in which case the same bodies are sent with a matching 4xx/5xx status.

use crate::config::Config;
use crate::extraction::DocumentPayload;
use crate::pipeline::{ErrorKind, PipelineFailure, SummaryApi};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const UPLOAD_FIELD: &str = "file";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Knobs for the HTTP layer.
#[derive(Debug, Clone, Copy)]
pub struct ApiOptions {
    /// Send 4xx/5xx statuses for failures instead of `200 OK`.
    pub strict_status_codes: bool,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl ApiOptions {
    /// Options taken from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            strict_status_codes: config.strict_status_codes,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            strict_status_codes: false,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

struct AppState<S> {
    service: Arc<S>,
    options: ApiOptions,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            options: self.options,
        }
    }
}

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>, options: ApiOptions) -> Router
where
    S: SummaryApi + 'static,
{
    Router::new()
        .route("/summarize-text/", post(summarize_upload::<S>))
        .route("/summarize-text", post(summarize_upload::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/health", get(health))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service, options })
}

/// Success response for `POST /summarize-text/`.
#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

/// Error body shared by every failure.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_response: Option<Value>,
}

/// Problems with the request itself, before the pipeline runs.
#[derive(Debug, Error)]
enum UploadError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Invalid multipart upload: {0}")]
    Multipart(String),
}

/// Summarize an uploaded document.
async fn summarize_upload<S>(
    State(state): State<AppState<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummaryApi,
{
    let strict = state.options.strict_status_codes;
    let payload = read_upload(multipart)
        .await
        .map_err(|error| AppError::upload(error, strict))?;

    tracing::info!(
        filename = %payload.filename,
        content_type = %payload.content_type,
        bytes = payload.bytes.len(),
        "Summarize request received"
    );

    let outcome = state
        .service
        .summarize_document(payload)
        .await
        .map_err(|failure| AppError::pipeline(failure, strict))?;

    Ok(Json(SummaryResponse {
        summary: outcome.summary.as_str().to_string(),
    }))
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<DocumentPayload, UploadError> {
    let mut multipart = multipart.map_err(|rejection| UploadError::Multipart(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| UploadError::Multipart(error.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|error| UploadError::Multipart(error.body_text()))?;
        return Ok(DocumentPayload::new(filename, content_type, bytes.to_vec()));
    }

    Err(UploadError::MissingFile)
}

/// Return summarization counters.
async fn get_metrics<S>(State(state): State<AppState<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: SummaryApi,
{
    Json(state.service.metrics_snapshot())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize-text/",
                description: "Upload a PDF, plain-text or Word document as multipart field `file`; the text is chunked and summarized. Response returns { \"summary\": string } or { \"error\": string }.",
                request_example: Some(json!({
                    "file": "@report.pdf;type=application/pdf"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization counters useful for observability dashboards.",
                request_example: None,
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe.",
                request_example: None,
            },
        ],
    })
}

struct AppError {
    status: StatusCode,
    body: ErrorResponse,
}

impl AppError {
    fn upload(error: UploadError, strict: bool) -> Self {
        tracing::warn!(error = %error, "Rejected upload");
        Self {
            status: if strict {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::OK
            },
            body: ErrorResponse {
                error: error.to_string(),
                raw_response: None,
            },
        }
    }

    fn pipeline(failure: PipelineFailure, strict: bool) -> Self {
        let status = if strict {
            status_for(failure.kind())
        } else {
            StatusCode::OK
        };
        Self {
            status,
            body: ErrorResponse {
                error: failure.to_string(),
                raw_response: failure.raw_response().cloned(),
            },
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::DecodeError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::RemoteServiceError | ErrorKind::UnexpectedResponseShape => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::PipelineError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
