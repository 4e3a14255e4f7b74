//! Caller token extraction.
//!
//! Reads the caller token from `X-Vault-Token`, falling back to
//! `Authorization: Bearer <token>`, and stores it in the request extensions
//! as [`CallerToken`]. The middleware never rejects: a missing token is
//! stored as an empty string, so the engine reports `sealed` before it
//! reports a bad token.

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

/// Header carrying the caller token.
pub const TOKEN_HEADER: &str = "X-Vault-Token";

/// The token presented by the caller. Empty when none was sent.
#[derive(Clone, Default)]
pub struct CallerToken(pub String);

impl CallerToken {
    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for CallerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CallerToken").field(&"[REDACTED]").finish()
    }
}

/// Pull the caller token out of `headers`.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(token.to_owned());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Middleware that attaches [`CallerToken`] to every request.
pub async fn caller_token(mut req: Request, next: Next) -> Response {
    let token = token_from_headers(req.headers()).unwrap_or_default();
    req.extensions_mut().insert(CallerToken(token));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn prefers_vault_token_header() {
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, HeaderValue::from_static("abc"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn ignores_other_schemes_and_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, HeaderValue::from_static(""));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(token_from_headers(&headers), None);
    }

    #[test]
    fn debug_hides_token() {
        let token = CallerToken("secret-token".to_owned());
        assert!(!format!("{token:?}").contains("secret-token"));
    }
}
