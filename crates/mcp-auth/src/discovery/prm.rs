//! Protected Resource Metadata (RFC 9728) discovery.

use mcp_core::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use url::Url;

use super::FetchOutcome;
use crate::endpoint_safety;
use crate::www_authenticate::Challenge;

/// `{resource, authorization_servers?, scopes_supported?, bearer_methods_supported?, resource_name?, resource_documentation?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_servers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_methods_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,
}

fn candidate_urls(challenge_resource_metadata: Option<&str>, server_url: &Url) -> Vec<Url> {
    let mut candidates = Vec::new();

    if let Some(url_str) = challenge_resource_metadata
        && let Ok(url) = Url::parse(url_str)
        && endpoint_safety::validate(&url).is_ok()
    {
        candidates.push(url);
    }

    let origin = server_url.origin().ascii_serialization();
    let path = server_url.path();
    if !path.is_empty() && path != "/" {
        if let Ok(url) = Url::parse(&format!("{origin}/.well-known/oauth-protected-resource{path}")) {
            candidates.push(url);
        }
    }
    if let Ok(url) = Url::parse(&format!("{origin}/.well-known/oauth-protected-resource")) {
        candidates.push(url);
    }

    candidates
}

/// Discover PRM for `server_url`, trying the `WWW-Authenticate`-provided
/// URL first (if any and it passes endpoint safety), then the
/// path-suffixed well-known URL, then the bare well-known URL.
pub async fn discover_prm(
    client: &reqwest::Client,
    server_url: &Url,
    challenge: Option<&Challenge>,
    protocol_version: &str,
) -> Result<ProtectedResourceMetadata, Error> {
    let candidates = candidate_urls(challenge.and_then(Challenge::resource_metadata), server_url);

    for url in candidates {
        match super::fetch_json::<ProtectedResourceMetadata>(client, &url, protocol_version).await {
            FetchOutcome::Found(prm) => return Ok(prm),
            FetchOutcome::TryNext => continue,
            FetchOutcome::Abort(error) => return Err(error),
        }
    }

    Err(Error::new(ErrorKind::DiscoveryFailed, "no protected resource metadata URL succeeded"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_order_prefers_challenge_then_path_suffixed_then_bare() {
        let server = Url::parse("https://example.com/api/mcp").unwrap();
        let candidates = candidate_urls(Some("https://example.com/.well-known/oauth-protected-resource/custom"), &server);
        assert_eq!(candidates[0].as_str(), "https://example.com/.well-known/oauth-protected-resource/custom");
        assert_eq!(candidates[1].as_str(), "https://example.com/.well-known/oauth-protected-resource/api/mcp");
        assert_eq!(candidates[2].as_str(), "https://example.com/.well-known/oauth-protected-resource");
    }

    #[test]
    fn unsafe_challenge_url_is_skipped() {
        let server = Url::parse("https://example.com/").unwrap();
        let candidates = candidate_urls(Some("javascript:alert(1)"), &server);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].as_str(), "https://example.com/.well-known/oauth-protected-resource");
    }

    #[test]
    fn root_path_server_url_skips_the_path_suffixed_candidate() {
        let server = Url::parse("https://example.com/").unwrap();
        let candidates = candidate_urls(None, &server);
        assert_eq!(candidates.len(), 1);
    }
}
