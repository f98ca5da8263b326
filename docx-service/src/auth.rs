//! Bearer token authentication and the request-id middleware (§4.9.1, §4.9.6).
//!
//! Every `/v1` route requires `Authorization: Bearer <token>` compared
//! against the configured `API_KEY` in constant time. Failure is reported
//! with a single fixed message regardless of whether the header was absent,
//! malformed, or simply wrong — the spec is explicit that the failure mode
//! MUST NOT be distinguishable from the response.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request},
    http::{header::HeaderName, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct AuthState {
    pub api_key: Arc<String>,
}

#[derive(Debug)]
pub struct AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": "UNAUTHORIZED",
                "message": "Invalid or missing API key",
                "details": []
            }
        });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Constant-time byte comparison — the loop always scans both slices fully
/// regardless of where they first differ, so timing does not leak how many
/// leading bytes matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Extractor requiring a valid bearer token. Routes that need auth take this
/// as a handler argument; routes that don't (health checks) simply omit it.
pub struct BearerAuth;

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = parts.extensions.get::<AuthState>().ok_or(AuthError)?;
        let token = extract_bearer_token(parts).ok_or(AuthError)?;
        if constant_time_eq(token.as_bytes(), auth_state.api_key.as_bytes()) {
            Ok(BearerAuth)
        } else {
            Err(AuthError)
        }
    }
}

/// Either echoes the client-supplied `X-Request-Id` or mints a fresh UUID,
/// stamps it onto the request extensions (for handlers/tracing) and onto
/// the response headers (every response, success or error).
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = id.parse() {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId(Uuid::new_v4().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_slices() {
        assert!(constant_time_eq(b"secret-token", b"secret-token"));
    }

    #[test]
    fn constant_time_eq_rejects_different_length() {
        assert!(!constant_time_eq(b"short", b"much-longer-value"));
    }

    #[test]
    fn constant_time_eq_rejects_single_byte_difference() {
        assert!(!constant_time_eq(b"secret-token", b"secret-tokeX"));
    }
}
