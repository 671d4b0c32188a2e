//! HTTP boundary.
//!
//! Decodes inbound requests into a JSON payload plus attachments, hands them
//! to the [`Dispatcher`], and mirrors `ecode` as the HTTP status.
//!
//! Endpoints:
//! - `POST /api/v1/chat/completions`: multipart (`json` field + files) or raw JSON
//! - `GET  /api/v1/status`
//! - `GET  /api/v1/health`
//! - `GET  /api/v1/logs?amount=N`
//! - `GET  /metrics`

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sysinfo::{ProcessesToUpdate, System};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use llmgate_core::config::ServerConfig;
use llmgate_core::utils::{timestamp, truncate_string};
use llmgate_core::{AttachmentDescriptor, ExternalResponse};

use crate::dispatcher::Dispatcher;
use crate::logbuf::{RecentLogs, DEFAULT_AMOUNT};
use crate::telemetry::prometheus_handle;

const SERVICE_NAME: &str = "llmgate";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub logs: RecentLogs,
    pub started_at: Instant,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, logs: RecentLogs) -> Self {
        Self {
            dispatcher,
            logs,
            started_at: Instant::now(),
            metrics: prometheus_handle(),
        }
    }
}

/// Build the router with every endpoint mounted.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/v1/chat/completions", post(completions))
        .route("/api/v1/status", get(status))
        .route("/api/v1/health", get(health))
        .route("/api/v1/logs", get(logs))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Bind `host:port` and serve until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    config: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(address = %addr, "llmgate listening");

    axum::serve(listener, router(state, config.max_body_bytes))
        .with_graceful_shutdown(shutdown)
        .await
}

// ─────────────────────────────────────────────
// Completions
// ─────────────────────────────────────────────

async fn completions(State(state): State<AppState>, request: Request) -> Response {
    let (payload, attachments) = match decode_completion(request).await {
        Ok(decoded) => decoded,
        Err(resp) => return respond(resp),
    };

    match state.dispatcher.dispatch(payload, attachments).await {
        Ok(resp) => respond(resp),
        Err(err) => {
            error!(error = %err, "request aborted by a configuration error");
            respond(ExternalResponse::client_error(
                500,
                "The service is not correctly configured.",
            ))
        }
    }
}

/// Status mirrors `ecode`.
fn respond(resp: ExternalResponse) -> Response {
    let status = StatusCode::from_u16(resp.ecode).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(resp)).into_response()
}

async fn decode_completion(
    request: Request,
) -> Result<(Value, Vec<AttachmentDescriptor>), ExternalResponse> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        return decode_multipart(request).await;
    }

    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| ExternalResponse::client_error(e.status().as_u16(), e.body_text()))?;
    if body.is_empty() {
        return Ok((Value::Object(Map::new()), Vec::new()));
    }
    let payload = parse_json(&body, "body")?;
    Ok((payload, Vec::new()))
}

async fn decode_multipart(
    request: Request,
) -> Result<(Value, Vec<AttachmentDescriptor>), ExternalResponse> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ExternalResponse::client_error(e.status().as_u16(), e.body_text()))?;

    let mut payload = None;
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let body = field.bytes().await.map_err(multipart_error)?;
            debug!(file = %file_name, bytes = body.len(), "received attachment");
            attachments.push(AttachmentDescriptor::new(file_name, body.to_vec(), content_type));
        } else if name == "json" {
            let text = field.bytes().await.map_err(multipart_error)?;
            payload = Some(parse_json(&text, "'json' field")?);
        } else {
            debug!(field = %name, "ignoring multipart field");
        }
    }

    Ok((payload.unwrap_or_else(|| Value::Object(Map::new())), attachments))
}

fn parse_json(raw: &[u8], source: &str) -> Result<Value, ExternalResponse> {
    serde_json::from_slice(raw).map_err(|e| {
        warn!(
            error = %e,
            body = %truncate_string(&String::from_utf8_lossy(raw), 200),
            "invalid JSON in {source}"
        );
        ExternalResponse::client_error(400, format!("Invalid JSON in {source}: {e}"))
    })
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ExternalResponse {
    warn!(error = %err, "failed to parse multipart data");
    ExternalResponse::client_error(
        err.status().as_u16(),
        format!("Failed to parse multipart data: {}", err.body_text()),
    )
}

// ─────────────────────────────────────────────
// Status, health, metrics, logs
// ─────────────────────────────────────────────

async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "memory_usage": memory_usage(),
        "build_version": env!("CARGO_PKG_VERSION"),
        "timestamp_utc": timestamp(),
        "total_requests": state.dispatcher.total_requests(),
        "total_tokens": state.dispatcher.usage().total(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    amount: Option<String>,
}

async fn logs(State(state): State<AppState>, Query(query): Query<LogsQuery>) -> Json<Vec<String>> {
    let amount = query
        .amount
        .and_then(|a| a.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_AMOUNT);
    Json(state.logs.recent(amount))
}

/// Resident memory of this process.
fn memory_usage() -> String {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return "unknown".to_string();
    };
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system
        .process(pid)
        .map(|process| human_bytes(process.memory()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn human_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} TB")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
