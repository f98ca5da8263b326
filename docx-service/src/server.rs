//! The HTTP surface: routing, multipart decoding, and response composition
//! for `/health`, `/v1/health`, `/v1/read`, and `/v1/apply` (§4.9).

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{Bytes, Body},
    error_handling::HandleErrorLayer,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tower::{timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;
use tracing::info;

use docx_core::{
    edit::{normalize, Edit, EditDecodeError},
    engine::memory::MemoryEngine,
    markdown,
    EditorMode, ExtractOptions,
};

use crate::{
    auth::{request_id_middleware, AuthState, BearerAuth},
    concurrency::ConcurrencyGate,
    config::ServiceConfig,
    errors::ApiError,
    lifecycle::EditorGuard,
    upload,
};

/// The engine this service drives. `docx-core` only defines the trait
/// boundary plus `MemoryEngine` (its in-repo test stand-in); swapping in a
/// real OOXML engine means changing this alias, nothing else in this file.
type Engine = MemoryEngine;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub gate: ConcurrencyGate,
}

/// Build the full middleware-wrapped router from an already-constructed
/// `AppState`. Split out from `serve` so integration tests can drive it with
/// `tower::ServiceExt::oneshot` without binding a real listener.
pub fn build_router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;
    let request_timeout = state.config.request_timeout;
    let auth_state = AuthState {
        api_key: Arc::new(state.config.api_key.clone()),
    };

    Router::new()
        .route("/health", get(healthz))
        .route("/v1/health", get(healthz))
        .route("/v1/read", post(read_handler))
        .route("/v1/apply", post(apply_handler))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(DefaultBodyLimit::max(max_file_size as usize))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(Extension(auth_state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let gate = ConcurrencyGate::new(config.max_document_concurrency);
    let state = AppState {
        config: config.clone(),
        gate,
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!(addr = %config.listen_addr(), "docx-service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Internal(err.to_string())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining in-flight requests");
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

struct UploadedField {
    file_name: Option<String>,
    data: Bytes,
}

async fn collect_multipart_fields(mut multipart: Multipart) -> Result<HashMap<String, UploadedField>, ApiError> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(|e| ApiError::Internal(e.to_string()))?;
        fields.insert(name, UploadedField { file_name, data });
    }
    Ok(fields)
}

fn require_multipart_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if content_type.starts_with("multipart/form-data") {
        Ok(())
    } else {
        Err(ApiError::InvalidContentType)
    }
}

fn classify_upload_error(err: upload::UploadError) -> ApiError {
    match err {
        upload::UploadError::NotAZip => ApiError::InvalidFileType,
        // The magic-byte check already passed by the time this runs, so an
        // archive whose central directory can't be read isn't the wrong file
        // type — it's either truncated/corrupt or a bomb; either way it's a
        // 4xx/422 extraction problem, never INVALID_FILE_TYPE.
        upload::UploadError::UnreadableArchive(_) => ApiError::ZipBombDetected,
        upload::UploadError::TotalTooLarge { .. } | upload::UploadError::SuspiciousRatio { .. } => {
            ApiError::ZipBombDetected
        }
    }
}

/// Decode the `edits` field per §4.9.4's format-detection rule, returning the
/// per-item decode results plus any format-level warnings (markdown only).
fn decode_edits(text: &str) -> Result<(Vec<Result<Edit, EditDecodeError>>, Vec<String>), ApiError> {
    if markdown::looks_like_markdown(text) {
        let parsed = markdown::parse(text).map_err(ApiError::InvalidEditsMarkdown)?;
        Ok((parsed.edits, parsed.warnings))
    } else {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ApiError::InvalidEditsJson(e.to_string()))?;
        match value {
            serde_json::Value::Array(items) => {
                let decoded = items.iter().map(normalize).collect();
                Ok((decoded, Vec::new()))
            }
            _ => Err(ApiError::MissingEdits),
        }
    }
}

fn sanitize_filename(original: &str) -> String {
    let stem = std::path::Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let sanitized: String = stem
        .chars()
        .filter(|c| c.is_ascii_graphic() && *c != '"' && *c != '\\')
        .collect();
    if sanitized.is_empty() {
        "document-edited.docx".to_string()
    } else {
        format!("{sanitized}-edited.docx")
    }
}

async fn read_handler(
    State(state): State<AppState>,
    _auth: BearerAuth,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    require_multipart_content_type(&headers)?;
    let mut fields = collect_multipart_fields(multipart).await?;
    let file = fields.remove("file").ok_or(ApiError::MissingFile)?;

    upload::check_magic_bytes(&file.data).map_err(|_| ApiError::InvalidFileType)?;
    upload::check_expansion_ratio(&file.data).map_err(classify_upload_error)?;

    let _permit = state
        .gate
        .acquire()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut guard = EditorGuard::<Engine>::open(&file.data, EditorMode::Editing)
        .map_err(|e| ApiError::DocumentLoadFailed(e.to_string()))?;

    let engine_blocks = guard.get().traverse();
    let filename = file.file_name.unwrap_or_else(|| "document.docx".to_string());
    let version = guard.get().version();
    let generated_at = chrono::Utc::now().to_rfc3339();
    let ir = docx_core::extract(&engine_blocks, &filename, version, &ExtractOptions::default(), &generated_at);
    guard.cleanup();

    Ok(Json(ir).into_response())
}

#[derive(Debug, Deserialize)]
struct ApplyQuery {
    #[serde(default)]
    dry_run: bool,
}

async fn apply_handler(
    State(state): State<AppState>,
    _auth: BearerAuth,
    Query(params): Query<ApplyQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    require_multipart_content_type(&headers)?;
    let mut fields = collect_multipart_fields(multipart).await?;

    let file = fields.remove("file").ok_or(ApiError::MissingFile)?;
    let edits_field = fields.remove("edits").ok_or(ApiError::MissingEdits)?;

    upload::check_magic_bytes(&file.data).map_err(|_| ApiError::InvalidFileType)?;
    upload::check_expansion_ratio(&file.data).map_err(classify_upload_error)?;

    let edits_text = String::from_utf8_lossy(&edits_field.data).into_owned();
    let (decoded, format_warnings) = decode_edits(&edits_text)?;

    let _permit = state
        .gate
        .acquire()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut guard = EditorGuard::<Engine>::open(&file.data, EditorMode::Editing)
        .map_err(|e| ApiError::DocumentLoadFailed(e.to_string()))?;

    let engine_blocks = guard.get().traverse();
    let filename = file.file_name.unwrap_or_else(|| "document.docx".to_string());
    let version = guard.get().version();
    let generated_at = chrono::Utc::now().to_rfc3339();
    let ir = docx_core::extract(&engine_blocks, &filename, version, &ExtractOptions::default(), &generated_at);

    let validation = docx_core::validate(&decoded, &ir);

    if params.dry_run {
        guard.cleanup();
        return Ok(Json(validation).into_response());
    }

    if !validation.valid {
        guard.cleanup();
        return Err(ApiError::InvalidEdits(validation.issues));
    }

    let ok_edits: Vec<Edit> = decoded.into_iter().filter_map(Result::ok).collect();
    let apply_result = docx_core::apply(ok_edits, &ir, guard.get_mut(), &state.config.default_author)
        .map_err(|e| ApiError::ApplyFailed(e.to_string()))?;

    let exported = guard.get_mut().export().map_err(|e| ApiError::ApplyFailed(e.to_string()))?;
    guard.cleanup();

    let recompressed = docx_core::recompress(&exported).map_err(|e| ApiError::Internal(e.to_string()))?;

    let disposition_name = sanitize_filename(&filename);
    let total_warnings = format_warnings.len() + validation.warnings.len();

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        )
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{disposition_name}\""),
        )
        .header("x-edits-applied", apply_result.applied.to_string())
        .header("x-edits-skipped", apply_result.skipped.len().to_string())
        .header("x-warnings", total_warnings.to_string())
        .body(Body::from(recompressed))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(response)
}
