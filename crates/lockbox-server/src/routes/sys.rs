//! System routes: `/v1/sys/*`
//!
//! Vault initialization, seal/unseal lifecycle, and health checks. None of
//! these require a token.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use lockbox_core::VaultStatus;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/v1/sys` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(status))
        .route("/health", get(health))
        .route("/init", axum::routing::post(init).put(init))
        .route("/unseal", axum::routing::post(unseal).put(unseal))
        .route("/seal", axum::routing::post(seal).put(seal))
}

// ── Request / Response types ─────────────────────────────────────────

/// Response body for `POST /v1/sys/init`.
#[derive(Serialize)]
pub struct InitResponse {
    /// Root token (shown once).
    pub root_token: String,
    /// Base64 master key (shown once).
    pub unseal_key: String,
}

/// Request body for `POST /v1/sys/unseal`.
#[derive(Debug, Deserialize)]
pub struct UnsealRequest {
    /// Base64 unseal key returned by init.
    pub key: String,
}

/// Response body for status, health, unseal, and seal.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Whether the vault has been initialized.
    pub initialized: bool,
    /// Whether the vault is currently sealed.
    pub sealed: bool,
}

impl From<VaultStatus> for StatusResponse {
    fn from(status: VaultStatus) -> Self {
        Self {
            initialized: status.initialized,
            sealed: status.sealed,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Current seal status.
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(state.vault.status().await.into())
}

/// Health check.
///
/// Returns 200 if unsealed, 503 if sealed, 501 if not initialized.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.vault.status().await;
    let code = if !status.initialized {
        StatusCode::NOT_IMPLEMENTED
    } else if status.sealed {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(StatusResponse::from(status)))
}

/// Initialize the vault. The vault is left sealed.
async fn init(State(state): State<Arc<AppState>>) -> Result<Json<InitResponse>, AppError> {
    let result = state.vault.initialize().await?;
    Ok(Json(InitResponse {
        root_token: result.root_token.clone(),
        unseal_key: result.unseal_key.clone(),
    }))
}

/// Unseal with the master key.
async fn unseal(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UnsealRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Json(body) = body?;
    let status = state.vault.unseal(&body.key).await?;
    Ok(Json(status.into()))
}

/// Seal the vault, zeroizing the master key.
async fn seal(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, AppError> {
    let status = state.vault.seal().await?;
    Ok(Json(status.into()))
}
