//! The error envelope and taxonomy (§4.9.4, §4.9.7, §7). One `ApiError`
//! variant per documented error code; `IntoResponse` composes the
//! `{"error":{"code","message","details"}}` shape uniformly.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::{json, Value};
use thiserror::Error;

use docx_core::ValidationIssue;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no file part in the request")]
    MissingFile,
    #[error("no edits field, or edits is not an array")]
    MissingEdits,
    #[error("edits JSON is malformed: {0}")]
    InvalidEditsJson(String),
    #[error("edits markdown is unparseable or empty: {0}")]
    InvalidEditsMarkdown(String),
    #[error("upload failed the magic-byte check")]
    InvalidFileType,
    #[error("archive failed the expansion-ratio check")]
    ZipBombDetected,
    #[error("expected multipart/form-data")]
    InvalidContentType,
    #[error("edit batch failed validation")]
    InvalidEdits(Vec<ValidationIssue>),
    #[error("editor construction failed: {0}")]
    DocumentLoadFailed(String),
    #[error("IR extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("apply failed: {0}")]
    ApplyFailed(String),
    #[error("request deadline exceeded")]
    Timeout,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::MissingFile => "MISSING_FILE",
            ApiError::MissingEdits => "MISSING_EDITS",
            ApiError::InvalidEditsJson(_) => "INVALID_EDITS_JSON",
            ApiError::InvalidEditsMarkdown(_) => "INVALID_EDITS_MARKDOWN",
            ApiError::InvalidFileType => "INVALID_FILE_TYPE",
            ApiError::ZipBombDetected => "ZIP_BOMB_DETECTED",
            ApiError::InvalidContentType => "INVALID_CONTENT_TYPE",
            ApiError::InvalidEdits(_) => "INVALID_EDITS",
            ApiError::DocumentLoadFailed(_) => "DOCUMENT_LOAD_FAILED",
            ApiError::ExtractionFailed(_) => "EXTRACTION_FAILED",
            ApiError::ApplyFailed(_) => "APPLY_FAILED",
            ApiError::Timeout => "REQUEST_TIMEOUT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile
            | ApiError::MissingEdits
            | ApiError::InvalidEditsJson(_)
            | ApiError::InvalidEditsMarkdown(_)
            | ApiError::InvalidFileType
            | ApiError::ZipBombDetected
            | ApiError::InvalidContentType
            | ApiError::InvalidEdits(_) => StatusCode::BAD_REQUEST,
            ApiError::DocumentLoadFailed(_) | ApiError::ExtractionFailed(_) | ApiError::ApplyFailed(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The outward message: a fixed string for 5xx, a sanitized
    /// engine-derived message otherwise.
    fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "An internal server error occurred".to_string(),
            ApiError::Timeout => "the request exceeded its deadline".to_string(),
            ApiError::DocumentLoadFailed(msg) | ApiError::ExtractionFailed(msg) | ApiError::ApplyFailed(msg) => {
                sanitize(msg)
            }
            ApiError::InvalidEditsJson(msg) | ApiError::InvalidEditsMarkdown(msg) => sanitize(msg),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Vec<Value> {
        match self {
            ApiError::InvalidEdits(issues) => issues
                .iter()
                .map(|issue| {
                    json!({
                        "editIndex": issue.edit_index,
                        "blockId": issue.block_id,
                        "type": issue.issue_type,
                        "message": issue.message,
                    })
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Strip file paths, stack-frame markers, and module-path noise from an
/// engine-derived message before it reaches the client (§4.9.7).
fn sanitize(raw: &str) -> String {
    raw.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.starts_with("at ") && !trimmed.contains("::")
        })
        .map(|line| strip_path_like_tokens(line))
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn strip_path_like_tokens(line: &str) -> String {
    line.split_whitespace()
        .filter(|tok| !tok.contains('/') && !tok.contains('\\') && !looks_like_line_col(tok))
        .collect::<Vec<_>>()
        .join(" ")
}

fn looks_like_line_col(tok: &str) -> bool {
    let mut parts = tok.rsplitn(3, ':');
    let last = parts.next();
    let mid = parts.next();
    matches!((last, mid), (Some(a), Some(b)) if a.chars().all(|c| c.is_ascii_digit()) && b.chars().all(|c| c.is_ascii_digit()) && !a.is_empty() && !b.is_empty())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.public_message(),
                "details": self.details(),
            }
        });
        (status, Json(body)).into_response()
    }
}
