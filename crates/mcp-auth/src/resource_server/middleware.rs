//! Bearer token extraction and verification for inbound requests.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use url::Url;

use crate::resource;

/// What a verified token told us about its holder.
#[derive(Debug, Clone, Default)]
pub struct AuthInfo {
    pub subject: Option<String>,
    pub scope: Option<String>,
    pub expires_at: Option<u64>,
    pub resource: Option<String>,
}

/// User-supplied token verification: typically introspection or local
/// JWT validation. The core has no opinion on how a token is verified,
/// only on what happens once it is.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Option<AuthInfo>;
}

/// What this resource server expects of tokens presented to it.
#[derive(Debug, Clone)]
pub struct ResourceServerConfig {
    pub resource: Url,
    pub scopes_supported: Option<Vec<String>>,
    pub resource_metadata_url: Option<Url>,
}

/// The outcome of authenticating one inbound request.
pub enum AuthResult {
    Authenticated(AuthInfo),
    Unauthorized(HttpResponse),
}

/// A minimal HTTP response: enough to drive any web framework's
/// response builder.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

fn error_response(status: u16, error: &str, description: &str, config: &ResourceServerConfig, scope_for_challenge: Option<&str>) -> HttpResponse {
    let body = serde_json::json!({
        "error": error,
        "error_description": description,
    });

    let mut challenge = format!("Bearer error=\"{}\", error_description=\"{}\"", escape(error), escape(description));
    if let Some(resource_metadata_url) = &config.resource_metadata_url {
        challenge.push_str(&format!(", resource_metadata=\"{}\"", escape(resource_metadata_url.as_str())));
    }
    if let Some(scope) = scope_for_challenge {
        challenge.push_str(&format!(", scope=\"{}\"", escape(scope)));
    }

    HttpResponse {
        status,
        headers: vec![("Content-Type".to_string(), "application/json".to_string()), ("WWW-Authenticate".to_string(), challenge)],
        body: body.to_string(),
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unauthorized(error: &str, description: &str, config: &ResourceServerConfig) -> AuthResult {
    let scope = config.scopes_supported.as_ref().map(|scopes| scopes.join(" "));
    AuthResult::Unauthorized(error_response(401, error, description, config, scope.as_deref()))
}

/// Build a `403 insufficient_scope` response, for callers that have
/// already authenticated the token but found it lacks a required
/// scope.
#[must_use]
pub fn forbidden_response(config: &ResourceServerConfig, required_scope: &str) -> HttpResponse {
    error_response(403, "insufficient_scope", "the token does not carry the required scope", config, Some(required_scope))
}

fn extract_bearer(authorization: Option<&str>) -> Option<&str> {
    let header = authorization?;
    let (scheme, rest) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() { None } else { Some(token) }
}

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Authenticate one inbound request against `config`, delegating token
/// verification to `verifier`.
pub async fn authenticate_request(authorization: Option<&str>, config: &ResourceServerConfig, verifier: &dyn TokenVerifier) -> AuthResult {
    let Some(token) = extract_bearer(authorization) else {
        return unauthorized("invalid_token", "missing or malformed Authorization header", config);
    };

    let Some(info) = verifier.verify_token(token).await else {
        return unauthorized("invalid_token", "token verification failed", config);
    };

    if let Some(expires_at) = info.expires_at
        && expires_at <= now_unix()
    {
        return unauthorized("invalid_token", "token has expired", config);
    }

    match info.resource.as_deref() {
        Some("") | None => unauthorized("invalid_token", "token carries no resource indicator", config),
        Some(resource_str) => match Url::parse(resource_str) {
            Ok(requested) if resource::matches(&requested, &config.resource) => AuthResult::Authenticated(info),
            _ => unauthorized("invalid_token", "token resource does not match this server", config),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedVerifier(Option<AuthInfo>);

    #[async_trait]
    impl TokenVerifier for FixedVerifier {
        async fn verify_token(&self, _token: &str) -> Option<AuthInfo> {
            self.0.clone()
        }
    }

    fn config() -> ResourceServerConfig {
        ResourceServerConfig { resource: Url::parse("https://api.example.com/mcp").unwrap(), scopes_supported: Some(vec!["mcp:read".to_string()]), resource_metadata_url: None }
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let result = authenticate_request(None, &config(), &FixedVerifier(None)).await;
        assert!(matches!(result, AuthResult::Unauthorized(r) if r.status == 401));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let result = authenticate_request(Some("Basic abc"), &config(), &FixedVerifier(None)).await;
        assert!(matches!(result, AuthResult::Unauthorized(r) if r.status == 401));
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let info = AuthInfo { subject: Some("u".to_string()), scope: None, expires_at: Some(1), resource: Some("https://api.example.com/mcp".to_string()) };
        let result = authenticate_request(Some("Bearer tok"), &config(), &FixedVerifier(Some(info))).await;
        assert!(matches!(result, AuthResult::Unauthorized(_)));
    }

    #[tokio::test]
    async fn resource_mismatch_is_unauthorized() {
        let info = AuthInfo { subject: None, scope: None, expires_at: None, resource: Some("https://other.example.com/mcp".to_string()) };
        let result = authenticate_request(Some("Bearer tok"), &config(), &FixedVerifier(Some(info))).await;
        assert!(matches!(result, AuthResult::Unauthorized(_)));
    }

    #[tokio::test]
    async fn valid_token_is_authenticated() {
        let info = AuthInfo { subject: Some("u".to_string()), scope: Some("mcp:read".to_string()), expires_at: None, resource: Some("https://api.example.com/mcp".to_string()) };
        let result = authenticate_request(Some("Bearer tok"), &config(), &FixedVerifier(Some(info))).await;
        assert!(matches!(result, AuthResult::Authenticated(_)));
    }

    #[test]
    fn www_authenticate_escapes_quotes_and_backslashes() {
        let response = error_response(401, "invalid_token", "has \"quotes\" and \\backslash\\", &config(), None);
        let header = response.headers.iter().find(|(k, _)| k == "WWW-Authenticate").unwrap();
        assert!(header.1.contains("has \\\"quotes\\\" and \\\\backslash\\\\"));
    }
}
