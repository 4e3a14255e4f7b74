//! Process hardening applied before any key material exists.
//!
//! - [`disable_core_dumps`] sets `RLIMIT_CORE` to 0 so a crash cannot write
//!   the master key to a core file.
//! - [`lock_memory`] calls `mlockall(MCL_CURRENT | MCL_FUTURE)` so the
//!   master key and decrypted secrets never reach swap.
//!
//! Both are no-ops on non-Unix platforms. Failures are reported, not fatal:
//! `mlockall` in particular needs `CAP_IPC_LOCK` or root.

use std::io;

use tracing::{info, warn};

use crate::config::ServerConfig;

/// Apply every hardening step allowed by `config`, logging the outcome.
pub fn apply(config: &ServerConfig) {
    match disable_core_dumps() {
        Ok(()) => info!("core dumps disabled"),
        Err(e) => warn!(error = %e, "failed to disable core dumps"),
    }

    if config.disable_mlock {
        warn!("mlock disabled by LOCKBOX_DISABLE_MLOCK, key material may be swapped to disk");
        return;
    }
    match lock_memory() {
        Ok(()) => info!("process memory locked"),
        Err(e) => warn!(
            error = %e,
            "mlockall failed (needs CAP_IPC_LOCK); set LOCKBOX_DISABLE_MLOCK=true to silence"
        ),
    }
}

/// Set `RLIMIT_CORE` to 0 for this process.
///
/// # Errors
///
/// Returns the OS error if `setrlimit` fails.
#[cfg(unix)]
pub fn disable_core_dumps() -> io::Result<()> {
    let rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `rlim` is a valid, initialized `rlimit` that outlives the
    // call; `setrlimit` only reads it.
    #[allow(unsafe_code)]
    let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlim) };

    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn disable_core_dumps() -> io::Result<()> {
    Ok(())
}

/// Pin all current and future pages of this process in RAM.
///
/// # Errors
///
/// Returns the OS error if `mlockall` fails, typically `EPERM`.
#[cfg(unix)]
pub fn lock_memory() -> io::Result<()> {
    // SAFETY: `mlockall` takes only flag bits and touches no memory we own.
    #[allow(unsafe_code)]
    let result = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };

    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn lock_memory() -> io::Result<()> {
    Ok(())
}
