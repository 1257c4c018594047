//! Authorization Server metadata (RFC 8414) discovery, with the
//! OpenID-Connect-Discovery fallback the MCP spec layers on top.

use mcp_core::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use url::Url;

use super::FetchOutcome;
use crate::endpoint_safety;

/// `{issuer, authorization_endpoint, token_endpoint, registration_endpoint?, ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_types_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id_metadata_document_supported: Option<bool>,
}

impl AsMetadata {
    /// Apply endpoint safety to every URL this metadata document hands
    /// back, before any of them are used.
    pub fn validate_endpoints(&self) -> Result<(), Error> {
        endpoint_safety::validate(&parse(&self.authorization_endpoint)?)?;
        endpoint_safety::validate(&parse(&self.token_endpoint)?)?;
        if let Some(registration_endpoint) = &self.registration_endpoint {
            endpoint_safety::validate(&parse(registration_endpoint)?)?;
        }
        Ok(())
    }
}

fn parse(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| Error::new(ErrorKind::DiscoveryFailed, format!("invalid endpoint URL `{url}`: {e}")))
}

fn candidate_urls(as_url: &Url) -> Vec<Url> {
    let origin = as_url.origin().ascii_serialization();
    let path = as_url.path();
    let has_path = !path.is_empty() && path != "/";
    let trimmed_path = path.trim_end_matches('/');

    let mut candidates = Vec::new();
    if has_path {
        for url in [
            format!("{origin}/.well-known/oauth-authorization-server{path}"),
            format!("{origin}/.well-known/openid-configuration{path}"),
            format!("{origin}{trimmed_path}/.well-known/openid-configuration"),
        ] {
            if let Ok(url) = Url::parse(&url) {
                candidates.push(url);
            }
        }
    } else {
        for url in [format!("{origin}/.well-known/oauth-authorization-server"), format!("{origin}/.well-known/openid-configuration")] {
            if let Ok(url) = Url::parse(&url) {
                candidates.push(url);
            }
        }
    }
    candidates
}

/// Discover AS metadata for `as_url`, trying RFC 8414's well-known path
/// then the two OIDC-discovery variants, validating the issuer on
/// success.
pub async fn discover_as_metadata(client: &reqwest::Client, as_url: &Url, protocol_version: &str) -> Result<AsMetadata, Error> {
    for url in candidate_urls(as_url) {
        match super::fetch_json::<AsMetadata>(client, &url, protocol_version).await {
            FetchOutcome::Found(metadata) => {
                super::validate_issuer(&metadata.issuer, as_url)?;
                metadata.validate_endpoints()?;
                return Ok(metadata);
            }
            FetchOutcome::TryNext => continue,
            FetchOutcome::Abort(error) => return Err(error),
        }
    }

    Err(Error::new(ErrorKind::DiscoveryFailed, "no authorization server metadata URL succeeded"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_order_with_path() {
        let as_url = Url::parse("https://auth.example.com/tenant1").unwrap();
        let candidates = candidate_urls(&as_url);
        assert_eq!(candidates[0].as_str(), "https://auth.example.com/.well-known/oauth-authorization-server/tenant1");
        assert_eq!(candidates[1].as_str(), "https://auth.example.com/.well-known/openid-configuration/tenant1");
        assert_eq!(candidates[2].as_str(), "https://auth.example.com/tenant1/.well-known/openid-configuration");
    }

    #[test]
    fn candidate_order_without_path() {
        let as_url = Url::parse("https://auth.example.com/").unwrap();
        let candidates = candidate_urls(&as_url);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].as_str(), "https://auth.example.com/.well-known/oauth-authorization-server");
    }
}
