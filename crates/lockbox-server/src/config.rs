//! Server configuration for Lockbox.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `LOCKBOX_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default bind address when neither `LOCKBOX_BIND_ADDR` nor `PORT` is set.
const DEFAULT_PORT: u16 = 8200;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Seconds between expired-token sweeps. `0` disables the sweep.
    pub token_sweep_interval_secs: u64,
    /// Whether to skip `mlock` (for development without root/`CAP_IPC_LOCK`).
    pub disable_mlock: bool,
}

/// Supported storage backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// Redb persistent storage.
    Redb { path: PathBuf },
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `LOCKBOX_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:8200`)
    /// - `LOCKBOX_STORAGE`: `redb` or `memory` (default: `redb`)
    /// - `LOCKBOX_STORAGE_PATH`: redb file path (default: `./lockbox-data/lockbox.redb`)
    /// - `LOCKBOX_LOG_LEVEL`: log filter (default: `info`)
    /// - `LOCKBOX_TOKEN_SWEEP_INTERVAL`: seconds between token sweeps (default: `300`)
    /// - `LOCKBOX_DISABLE_MLOCK`: skip `mlockall` for dev environments (default: `false`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Priority: LOCKBOX_BIND_ADDR > PORT > default 127.0.0.1:8200
        let default_addr = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT));
        let bind_addr = if let Some(addr) = lookup("LOCKBOX_BIND_ADDR") {
            addr.parse().unwrap_or(default_addr)
        } else if let Some(port) = lookup("PORT") {
            SocketAddr::from(([0, 0, 0, 0], port.parse().unwrap_or(DEFAULT_PORT)))
        } else {
            default_addr
        };

        let storage_path = lookup("LOCKBOX_STORAGE_PATH")
            .map_or_else(|| PathBuf::from("./lockbox-data/lockbox.redb"), PathBuf::from);

        let storage_backend = match lookup("LOCKBOX_STORAGE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackendType::Memory,
            _ => StorageBackendType::Redb { path: storage_path },
        };

        let log_level = lookup("LOCKBOX_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let token_sweep_interval_secs = lookup("LOCKBOX_TOKEN_SWEEP_INTERVAL")
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let disable_mlock =
            lookup("LOCKBOX_DISABLE_MLOCK").is_some_and(|v| v == "true" || v == "1");

        Self {
            bind_addr,
            storage_backend,
            log_level,
            token_sweep_interval_secs,
            disable_mlock,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8200)));
        assert_eq!(
            cfg.storage_backend,
            StorageBackendType::Redb {
                path: PathBuf::from("./lockbox-data/lockbox.redb")
            }
        );
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.token_sweep_interval_secs, 300);
        assert!(!cfg.disable_mlock);
    }

    #[test]
    fn port_binds_all_interfaces() {
        let cfg = config(&[("PORT", "9000")]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([0, 0, 0, 0], 9000)));
    }

    #[test]
    fn bind_addr_overrides_port() {
        let cfg = config(&[("PORT", "9000"), ("LOCKBOX_BIND_ADDR", "10.0.0.1:8300")]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([10, 0, 0, 1], 8300)));
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = config(&[
            ("LOCKBOX_BIND_ADDR", "not-an-addr"),
            ("LOCKBOX_TOKEN_SWEEP_INTERVAL", "soon"),
        ]);
        assert_eq!(cfg.bind_addr.port(), 8200);
        assert_eq!(cfg.token_sweep_interval_secs, 300);
    }

    #[test]
    fn memory_storage_and_flags() {
        let cfg = config(&[
            ("LOCKBOX_STORAGE", "Memory"),
            ("LOCKBOX_DISABLE_MLOCK", "1"),
            ("LOCKBOX_TOKEN_SWEEP_INTERVAL", "0"),
        ]);
        assert_eq!(cfg.storage_backend, StorageBackendType::Memory);
        assert!(cfg.disable_mlock);
        assert_eq!(cfg.token_sweep_interval_secs, 0);
    }
}
