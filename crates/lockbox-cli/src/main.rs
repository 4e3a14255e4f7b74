//! Lockbox CLI: command-line client for the Lockbox secrets vault.
//!
//! A standalone HTTP client that talks to `lockbox-server` over its JSON
//! API. No internal crate dependencies.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";
const BG_RED: &str = "\x1b[41m";
const BG_GREEN: &str = "\x1b[42m";

static COLOR: AtomicBool = AtomicBool::new(true);

/// `println!` that drops ANSI escapes when color is off.
macro_rules! out {
    () => {
        println!()
    };
    ($($arg:tt)*) => {
        emit(&format!($($arg)*))
    };
}

fn emit(line: &str) {
    if COLOR.load(Ordering::Relaxed) {
        println!("{line}");
    } else {
        println!("{}", strip_ansi(line));
    }
}

/// Remove `ESC [ ... m` sequences.
fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

// ── CLI structure ────────────────────────────────────────────────────

/// Lockbox: a single-node secrets vault.
#[derive(Parser)]
#[command(
    name = "lockbox",
    version,
    about = "Lockbox CLI: initialize, unseal, and manage secrets and tokens",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         VAULT_ADDR    Server address (default: http://127.0.0.1:8200)\n  \
         VAULT_TOKEN   Authentication token\n\n\
         {DIM}Examples:{RESET}\n  \
         lockbox init\n  \
         lockbox unseal <unseal-key>\n  \
         lockbox write myapp/config db_host=10.0.0.1 db_port=5432\n  \
         lockbox token-create 1h30m"
    ),
)]
struct Cli {
    /// Lockbox server address.
    #[arg(long, env = "VAULT_ADDR", default_value = "http://127.0.0.1:8200")]
    addr: String,

    /// Authentication token.
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Disable colored output.
    #[arg(long, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the vault is initialized and sealed.
    Status,
    /// Initialize a new vault (prints the root token and unseal key once).
    Init,
    /// Unseal the vault with the key printed by `init`.
    Unseal {
        /// Base64 unseal key.
        key: String,
    },
    /// Seal the vault (zeroizes the master key in server memory).
    Seal,
    /// Re-admit the root token after a server restart.
    Auth,
    /// Write a secret from key=value pairs, replacing any existing one.
    Write {
        /// Secret path (e.g. "myapp/config").
        path: String,
        /// Key-value pairs in key=value format.
        #[arg(required = true)]
        data: Vec<String>,
    },
    /// Read a secret.
    Read {
        /// Secret path.
        path: String,
    },
    /// Delete a secret.
    Delete {
        /// Secret path.
        path: String,
    },
    /// List secret paths under a prefix.
    List {
        /// Path prefix (lists everything when omitted).
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Create a new non-root token (root only).
    TokenCreate {
        /// Time-to-live, e.g. "30m", "1h30m", "7d" (server default: 24h).
        ttl: Option<String>,
    },
    /// Revoke a token (defaults to the current token).
    TokenRevoke {
        /// Token to revoke.
        token: Option<String>,
    },
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    out!("{BOLD}{CYAN}{icon} {title}{RESET}");
    out!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    out!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    out!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    out!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn print_status(resp: &Value) {
    let initialized = resp.get("initialized").and_then(Value::as_bool).unwrap_or(false);
    let sealed = resp.get("sealed").and_then(Value::as_bool).unwrap_or(true);

    header("🔐", "Vault Status");

    let init_status = if initialized {
        format!("{GREEN}yes{RESET}")
    } else {
        format!("{RED}no{RESET}")
    };
    kv_line("Initialized", &init_status);

    let seal_status = if sealed {
        format!("{BG_RED}{WHITE}{BOLD} SEALED {RESET}")
    } else {
        format!("{BG_GREEN}{WHITE}{BOLD} UNSEALED {RESET}")
    };
    kv_line("Seal Status", &seal_status);
    out!();
}

fn print_init_response(resp: &Value) {
    header("🔑", "Vault Initialized");
    out!();
    out!("  {YELLOW}{BOLD}⚠  Store the unseal key and root token somewhere safe.{RESET}");
    out!("  {YELLOW}   They will NOT be shown again.{RESET}");
    out!();

    if let Some(key) = resp.get("unseal_key").and_then(Value::as_str) {
        out!("  {DIM}Unseal Key:{RESET}    {MAGENTA}{key}{RESET}");
    }
    if let Some(token) = resp.get("root_token").and_then(Value::as_str) {
        out!("  {DIM}Root Token:{RESET}    {GREEN}{BOLD}{token}{RESET}");
    }

    out!();
    out!("  {DIM}Vault is initialized but {YELLOW}{BOLD}sealed{RESET}{DIM}. Run `lockbox unseal <key>`.{RESET}");
    out!();
}

fn print_secret_response(path: &str, resp: &Value) {
    header("📦", &format!("Secret: {path}"));

    match resp.get("data").and_then(Value::as_object) {
        Some(obj) if obj.is_empty() => out!("  {DIM}(empty){RESET}"),
        Some(obj) => {
            for (k, v) in obj {
                let display = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                kv_line(k, &display);
            }
        }
        None => print_json(resp),
    }
    out!();
}

fn print_list_response(prefix: &str, resp: &Value) {
    let title = if prefix.is_empty() { "/" } else { prefix };
    header("📂", &format!("Keys: {title}"));

    match resp.get("keys").and_then(Value::as_array) {
        Some(keys) if keys.is_empty() => out!("  {DIM}(empty){RESET}"),
        Some(keys) => {
            for key in keys.iter().filter_map(Value::as_str) {
                out!("  {CYAN}├─{RESET} {key}");
            }
        }
        None => print_json(resp),
    }
    out!();
}

fn print_json(value: &Value) {
    if value.is_null() {
        return;
    }
    match serde_json::to_string_pretty(value) {
        Ok(s) => out!("{s}"),
        Err(e) => eprintln!("failed to format JSON: {e}"),
    }
}

// ── HTTP client ──────────────────────────────────────────────────────

struct Client {
    http: reqwest::Client,
    addr: String,
    token: Option<String>,
}

impl Client {
    fn new(addr: &str, token: Option<String>) -> Self {
        let http = reqwest::Client::new();
        Self {
            http,
            addr: addr.trim_end_matches('/').to_owned(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.addr)
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .context("no token provided: set VAULT_TOKEN or use --token")
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let resp = self
            .http
            .get(self.url(path))
            .header("X-Vault-Token", self.token()?)
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(self.url(path))
            .header("X-Vault-Token", self.token()?)
            .json(body)
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        let resp = self
            .http
            .delete(self.url(path))
            .header("X-Vault-Token", self.token()?)
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    async fn get_no_auth(&self, path: &str) -> Result<Value> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    async fn post_no_auth(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        let mut req = self.http.post(self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.context("request failed")?;
        handle_response(resp).await
    }
}

async fn handle_response(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.text().await.context("failed to read response body")?;
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or(body);
        bail!("server returned {status}: {message}");
    }
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).context("failed to parse response JSON")
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.no_color {
        COLOR.store(false, Ordering::Relaxed);
    }
    let client = Client::new(&cli.addr, cli.token);

    match run(&client, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let line = format!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            if COLOR.load(Ordering::Relaxed) {
                eprintln!("{line}");
            } else {
                eprintln!("{}", strip_ansi(&line));
            }
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &Client, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Status => {
            let resp = client.get_no_auth("/v1/sys/status").await?;
            out!();
            print_status(&resp);
        }
        Commands::Init => {
            let resp = client.post_no_auth("/v1/sys/init", None).await?;
            out!();
            print_init_response(&resp);
        }
        Commands::Unseal { key } => {
            let resp = client
                .post_no_auth("/v1/sys/unseal", Some(&json!({ "key": key })))
                .await?;
            out!();
            success("Vault unsealed.");
            print_status(&resp);
        }
        Commands::Seal => {
            client.post_no_auth("/v1/sys/seal", None).await?;
            out!();
            warning("Vault sealed: master key zeroized from server memory.");
            out!();
        }
        Commands::Auth => {
            client
                .post("/v1/auth/token/authenticate", &json!({}))
                .await?;
            out!();
            success("Root token authenticated.");
            out!();
        }
        Commands::Write { path, data } => {
            let map = parse_kv_pairs(&data)?;
            client
                .post(&secret_path(&path), &json!({ "data": map }))
                .await?;
            out!();
            success(&format!("Secret written to {BOLD}{path}{RESET}"));
            out!();
        }
        Commands::Read { path } => {
            let resp = client.get(&secret_path(&path)).await?;
            out!();
            print_secret_response(&path, &resp);
        }
        Commands::Delete { path } => {
            client.delete(&secret_path(&path)).await?;
            out!();
            success(&format!("Secret at {BOLD}{path}{RESET} deleted."));
            out!();
        }
        Commands::List { prefix } => {
            let resp = client
                .get(&format!(
                    "/v1/secrets/list?prefix={}",
                    urlencoding::encode(&prefix)
                ))
                .await?;
            out!();
            print_list_response(&prefix, &resp);
        }
        Commands::TokenCreate { ttl } => {
            let body = ttl.map_or_else(|| json!({}), |ttl| json!({ "ttl": ttl }));
            let resp = client.post("/v1/auth/token/create", &body).await?;
            out!();
            header("🎫", "Token Created");
            if let Some(token) = resp.get("token").and_then(Value::as_str) {
                kv_line("Token", &format!("{GREEN}{BOLD}{token}{RESET}"));
            }
            out!();
        }
        Commands::TokenRevoke { token } => {
            let body = token.map_or_else(|| json!({}), |token| json!({ "token": token }));
            client.post("/v1/auth/token/revoke", &body).await?;
            out!();
            success("Token revoked.");
            out!();
        }
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────

fn parse_kv_pairs(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| anyhow::anyhow!("invalid key=value pair: '{pair}'"))?;
        map.insert(key.to_owned(), Value::String(value.to_owned()));
    }
    Ok(map)
}

/// API path for a secret. Each `/`-separated segment is percent-encoded so
/// `#`, `?` and friends stay part of the secret path.
fn secret_path(path: &str) -> String {
    let encoded: Vec<_> = path.split('/').map(urlencoding::encode).collect();
    format!("/v1/secret/{}", encoded.join("/"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kv_pairs_keep_everything_after_first_equals() {
        let map = parse_kv_pairs(&["url=a=b".to_owned(), "empty=".to_owned()]).unwrap();
        assert_eq!(map["url"], json!("a=b"));
        assert_eq!(map["empty"], json!(""));
    }

    #[test]
    fn kv_pairs_reject_missing_key_or_separator() {
        assert!(parse_kv_pairs(&["novalue".to_owned()]).is_err());
        assert!(parse_kv_pairs(&["=v".to_owned()]).is_err());
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        let colored = format!("{BOLD}{GREEN}ok{RESET} done");
        assert_eq!(strip_ansi(&colored), "ok done");
    }

    #[test]
    fn secret_path_keeps_separators() {
        assert_eq!(secret_path("app/db"), "/v1/secret/app/db");
    }

    #[test]
    fn secret_path_escapes_url_delimiters() {
        assert_eq!(secret_path("a#b"), "/v1/secret/a%23b");
        assert_eq!(secret_path("a?b"), "/v1/secret/a%3Fb");
        assert_eq!(secret_path("my app/db 1"), "/v1/secret/my%20app/db%201");
    }
}
