//! HTTP routes for Lockbox.
//!
//! Routes are organized by subsystem:
//! - `sys`: lifecycle (status, health, init, unseal, seal)
//! - `secrets`: secret CRUD under `/v1/secret/*` and listing under `/v1/secrets/list`
//! - `auth`: token create, root token authentication, revoke

pub mod auth;
pub mod secrets;
pub mod sys;

use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::caller_token;
use crate::state::AppState;

/// Maximum in-flight requests on `/v1/sys`.
const SYS_CONCURRENCY_LIMIT: usize = 10;

/// Build the complete application router.
pub fn router(state: Arc<AppState>) -> Router {
    // Lifecycle calls take the engine's write lock; keep them from piling up.
    let sys_routes = Router::new()
        .nest("/v1/sys", sys::router())
        .layer(tower::limit::ConcurrencyLimitLayer::new(SYS_CONCURRENCY_LIMIT));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-vault-token"),
        ]);

    Router::new()
        .merge(sys_routes)
        .nest("/v1/secret", secrets::router())
        .nest("/v1/secrets", secrets::list_router())
        .nest("/v1/auth/token", auth::router())
        .layer(axum::middleware::from_fn(caller_token))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
