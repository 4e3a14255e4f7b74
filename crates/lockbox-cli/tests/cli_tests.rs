//! Integration tests for the `lockbox` CLI binary.
//!
//! These run the CLI as a subprocess against an address where nothing is
//! listening, so they check argument handling, local validation, and error
//! reporting without a server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::Command;

fn lockbox_bin() -> String {
    let path = env!("CARGO_BIN_EXE_lockbox");
    assert!(Path::new(path).exists(), "lockbox binary not found at {path}");
    path.to_owned()
}

/// Run lockbox with args and return (`exit_code`, stdout, stderr).
fn run(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(lockbox_bin())
        .args(args)
        .env("VAULT_ADDR", "http://127.0.0.1:19999")
        .env_remove("VAULT_TOKEN")
        .env_remove("NO_COLOR")
        .output()
        .expect("failed to execute lockbox");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn version_flag() {
    let (code, stdout, _) = run(&["--version"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("lockbox"), "version output: {stdout}");
}

#[test]
fn help_lists_every_command() {
    let (code, stdout, _) = run(&["--help"]);
    assert_eq!(code, 0);
    for command in [
        "status",
        "init",
        "unseal",
        "seal",
        "auth",
        "write",
        "read",
        "delete",
        "list",
        "token-create",
        "token-revoke",
    ] {
        assert!(stdout.contains(command), "help should list '{command}'");
    }
}

#[test]
fn missing_subcommand_fails() {
    let (code, _, stderr) = run(&[]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
}

#[test]
fn unseal_requires_key_argument() {
    let (code, _, _) = run(&["unseal"]);
    assert_eq!(code, 2, "clap usage errors exit with 2");
}

// ── Local validation ─────────────────────────────────────────────────

#[test]
fn write_rejects_malformed_pair() {
    let (code, _, stderr) = run(&["--token", "t", "write", "app/db", "novalue"]);
    assert_eq!(code, 1);
    assert!(
        stderr.contains("invalid key=value pair: 'novalue'"),
        "stderr: {stderr}"
    );
}

#[test]
fn token_commands_require_a_token() {
    for args in [
        &["read", "app/db"][..],
        &["list"][..],
        &["token-create", "1h"][..],
        &["auth"][..],
    ] {
        let (code, _, stderr) = run(args);
        assert_eq!(code, 1, "{args:?}");
        assert!(stderr.contains("no token provided"), "stderr: {stderr}");
    }
}

// ── Unreachable server ───────────────────────────────────────────────

#[test]
fn status_reports_connection_failure() {
    let (code, _, stderr) = run(&["status"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("request failed"), "stderr: {stderr}");
}

#[test]
fn no_color_strips_escape_codes() {
    let (code, _, stderr) = run(&["--no-color", "--token", "t", "read", "a"]);
    assert_eq!(code, 1);
    assert!(!stderr.contains('\x1b'), "stderr: {stderr:?}");
    assert!(stderr.contains("Error:"));
}
