//! Shared token-refresh POST (RFC 6749 §6), reused by every provider.

use mcp_core::{Error, ErrorKind};
use mcp_wire::encode_form;
use url::Url;

use crate::client_auth::{ClientAuthMethod, Credentials, apply};
use crate::token::TokenSet;

/// A JWT client assertion to attach instead of basic/post credentials,
/// per RFC 7523 (used by the private-key-JWT provider).
pub struct Assertion {
    pub jwt: String,
}

const ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Refresh `refresh_token` at `token_endpoint`. If the response omits a
/// new `refresh_token`, the original one is preserved in the result.
#[allow(clippy::too_many_arguments)]
pub async fn refresh(
    client: &reqwest::Client,
    token_endpoint: &str,
    refresh_token: &str,
    resource: Option<&Url>,
    auth: Option<(ClientAuthMethod, &str, Option<&str>)>,
    assertion: Option<&Assertion>,
) -> Result<TokenSet, Error> {
    let resource_str = resource.map(std::string::ToString::to_string);
    let mut form: Vec<(String, String)> = vec![("grant_type".to_string(), "refresh_token".to_string()), ("refresh_token".to_string(), refresh_token.to_string())];
    if let Some(resource_str) = &resource_str {
        form.push(("resource".to_string(), resource_str.clone()));
    }

    let mut request = client.post(token_endpoint).header("Content-Type", "application/x-www-form-urlencoded");
    let mut authorization_header = None;
    if let Some(assertion) = assertion {
        form.push(("client_assertion_type".to_string(), ASSERTION_TYPE.to_string()));
        form.push(("client_assertion".to_string(), assertion.jwt.clone()));
    } else if let Some((method, client_id, client_secret)) = auth {
        let Credentials { authorization_header: header, body_params } = apply(method, client_id, client_secret);
        form.extend(body_params);
        authorization_header = header;
    }
    if let Some(header) = authorization_header {
        request = request.header("Authorization", header);
    }

    let body = encode_form(form.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let response = request
        .body(body)
        .send()
        .await
        .map_err(|e| Error::new(ErrorKind::TokenRefreshFailed, format!("refresh request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let error = body.get("error").and_then(|v| v.as_str()).unwrap_or_default();
        if error == "invalid_grant" {
            return Err(Error::new(ErrorKind::TokenRefreshFailed, "invalid_grant"));
        }
        return Err(Error::new(ErrorKind::TokenRefreshFailed, format!("refresh failed with status {status}: {error}")));
    }

    let mut new_tokens: TokenSet =
        response.json().await.map_err(|e| Error::new(ErrorKind::TokenRefreshFailed, format!("invalid refresh response: {e}")))?;
    if new_tokens.refresh_token.is_none() {
        new_tokens.refresh_token = Some(refresh_token.to_string());
    }
    new_tokens.normalized()
}
