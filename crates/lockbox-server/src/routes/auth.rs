//! Token routes: `/v1/auth/token/*`
//!
//! The caller token always comes from the request headers. `create` and
//! `revoke` take an optional JSON body; an absent body uses the defaults.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::CallerToken;
use crate::routes::secrets::StatusMessage;
use crate::state::AppState;

/// TTL used when `create` is called without one.
const DEFAULT_TOKEN_TTL: &str = "24h";

/// Build the `/v1/auth/token` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(create_token))
        .route("/authenticate", post(authenticate))
        .route("/revoke", post(revoke_token))
}

// ── Request / Response types ─────────────────────────────────────────

/// Request body for `POST /v1/auth/token/create`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTokenRequest {
    /// Duration string such as `30m` or `1h30m`. Defaults to `24h`.
    #[serde(default)]
    pub ttl: Option<String>,
}

/// Response body for `POST /v1/auth/token/create`.
#[derive(Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
}

/// Request body for `POST /v1/auth/token/revoke`.
#[derive(Default, Deserialize)]
pub struct RevokeTokenRequest {
    /// Token to revoke. Defaults to the caller's own token.
    #[serde(default)]
    pub token: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn create_token(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerToken>,
    body: Result<Option<Json<CreateTokenRequest>>, JsonRejection>,
) -> Result<Json<CreateTokenResponse>, AppError> {
    let body = body?.map(|Json(b)| b).unwrap_or_default();
    let ttl = parse_duration(body.ttl.as_deref().unwrap_or(DEFAULT_TOKEN_TTL))?;
    let token = state.vault.create_token(caller.as_str(), ttl).await?;
    Ok(Json(CreateTokenResponse { token }))
}

/// Re-admit the root token presented in the request headers.
async fn authenticate(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerToken>,
) -> Result<Json<StatusMessage>, AppError> {
    state.vault.authenticate_root_token(caller.as_str()).await?;
    Ok(Json(StatusMessage {
        status: "authenticated",
    }))
}

async fn revoke_token(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerToken>,
    body: Result<Option<Json<RevokeTokenRequest>>, JsonRejection>,
) -> Result<Json<StatusMessage>, AppError> {
    let body = body?.map(|Json(b)| b).unwrap_or_default();
    let target = body.token.unwrap_or_else(|| caller.as_str().to_owned());
    state.vault.revoke_token(caller.as_str(), &target).await?;
    Ok(Json(StatusMessage { status: "revoked" }))
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Parse a duration string like `"90"`, `"500ms"`, `"30m"`, or `"1h 30m"`.
///
/// A bare integer is seconds. Anything else goes through
/// [`humantime::parse_duration`], which takes one or more `<integer><unit>`
/// groups (`ns`, `us`, `ms`, `s`, `m`, `h`, `d`, `w`, ...), optionally
/// separated by spaces.
///
/// # Errors
///
/// Returns [`AppError::BadRequest`] if the string is empty, malformed, or
/// out of range.
pub fn parse_duration(s: &str) -> Result<Duration, AppError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(AppError::BadRequest("empty duration string".to_owned()));
    }

    if let Ok(secs) = s.parse::<i64>() {
        return Duration::try_seconds(secs)
            .ok_or_else(|| AppError::BadRequest(format!("duration out of range: {s}")));
    }

    let std_duration = humantime::parse_duration(s)
        .map_err(|e| AppError::BadRequest(format!("invalid duration '{s}': {e}")))?;
    Duration::from_std(std_duration)
        .map_err(|_| AppError::BadRequest(format!("duration out of range: {s}")))
}
