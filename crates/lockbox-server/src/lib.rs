//! Lockbox HTTP server.
//!
//! Wires the vault engine and a storage backend into an Axum JSON API under
//! `/v1/*`. Handlers only translate between HTTP and [`lockbox_core::Vault`]
//! calls; all domain rules live in the engine.

pub mod config;
pub mod error;
pub mod hardening;
pub mod middleware;
pub mod routes;
pub mod shutdown;
pub mod state;
