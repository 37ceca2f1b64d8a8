use axum::{
    body::Bytes,
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domains::refresh::{run_refresh_cycle, RefreshError};
use crate::server::app::AppState;

/// Upper bound on a caller-supplied batch limit.
const MAX_TRIGGER_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Overrides `REFRESH_BATCH_LIMIT` for this cycle
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Parse the optional request body. An empty body means "use defaults";
/// anything else must be a valid request.
fn parse_request(body: &[u8]) -> Result<RefreshRequest, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RefreshRequest::default());
    }

    let request: RefreshRequest =
        serde_json::from_slice(body).map_err(|e| format!("Invalid request body: {}", e))?;

    match request.limit {
        Some(limit) if limit > MAX_TRIGGER_LIMIT => Err(format!(
            "limit must be at most {}, got {}",
            MAX_TRIGGER_LIMIT, limit
        )),
        _ => Ok(request),
    }
}

fn is_authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim() == expected)
        .unwrap_or(false)
}

/// Run one refresh cycle on demand.
///
/// Used by external schedulers. Replies with the cycle summary, 409 if a
/// cycle is already running in this process, 400 for a malformed body, and
/// 500/504 when the cycle aborts.
pub async fn refresh_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_authorized(&headers, state.trigger_token.as_deref()) {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid or missing bearer token");
    }

    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    match run_refresh_cycle(&state.deps, request.limit).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e @ RefreshError::AlreadyRunning) => error_response(StatusCode::CONFLICT, e.to_string()),
        Err(e @ RefreshError::TimedOut(_)) => {
            error_response(StatusCode::GATEWAY_TIMEOUT, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Triggered refresh cycle failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
