//! Shared application state.
//!
//! One [`AppState`] is built at startup and shared across all Axum
//! handlers via `Arc`.

use std::sync::Arc;

use lockbox_core::Vault;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// The vault engine.
    pub vault: Arc<Vault>,
}

impl AppState {
    #[must_use]
    pub fn new(vault: Arc<Vault>) -> Self {
        Self { vault }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
