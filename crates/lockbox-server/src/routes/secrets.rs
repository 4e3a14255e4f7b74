//! Secret routes: `/v1/secret/{path}` and `/v1/secrets/list`.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use lockbox_core::SecretData;

use crate::error::AppError;
use crate::middleware::CallerToken;
use crate::state::AppState;

/// Build the `/v1/secret` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/{*path}",
        get(read_secret)
            .post(write_secret)
            .put(write_secret)
            .delete(delete_secret),
    )
}

/// Build the `/v1/secrets` router.
pub fn list_router() -> Router<Arc<AppState>> {
    Router::new().route("/list", get(list_secrets))
}

// ── Request / Response types ─────────────────────────────────────────

/// Request body for writing a secret.
#[derive(Debug, Deserialize)]
pub struct WriteSecretRequest {
    /// Key/value payload. Replaces whatever was stored before.
    pub data: SecretData,
    /// Optional annotations stored alongside the payload.
    #[serde(default)]
    pub metadata: SecretData,
}

/// Response body for reading a secret.
#[derive(Debug, Serialize)]
pub struct ReadSecretResponse {
    pub data: SecretData,
}

/// Response body for mutating calls.
#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
}

/// Query parameters for listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub prefix: String,
}

/// Response body for listing.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub keys: Vec<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn read_secret(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    Path(path): Path<String>,
) -> Result<Json<ReadSecretResponse>, AppError> {
    let secret = state.vault.read_secret(token.as_str(), &path).await?;
    Ok(Json(ReadSecretResponse { data: secret.data }))
}

async fn write_secret(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    Path(path): Path<String>,
    body: Result<Json<WriteSecretRequest>, JsonRejection>,
) -> Result<Json<StatusMessage>, AppError> {
    let Json(body) = body?;
    state
        .vault
        .write_secret_with_metadata(token.as_str(), &path, body.data, body.metadata)
        .await?;
    Ok(Json(StatusMessage { status: "ok" }))
}

async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    Path(path): Path<String>,
) -> Result<Json<StatusMessage>, AppError> {
    state.vault.delete_secret(token.as_str(), &path).await?;
    Ok(Json(StatusMessage { status: "deleted" }))
}

async fn list_secrets(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse>, AppError> {
    let Query(query) = query?;
    let keys = state.vault.list_secrets(token.as_str(), &query.prefix).await?;
    Ok(Json(ListResponse { keys }))
}
