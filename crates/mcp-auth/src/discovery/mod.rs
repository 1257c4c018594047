//! OAuth discovery: Protected Resource Metadata (RFC 9728) and
//! Authorization Server metadata (RFC 8414 + OIDC Discovery), with the
//! strictly ordered fallback chains and issuer validation the spec
//! requires.

mod as_metadata;
mod prm;

pub use as_metadata::{AsMetadata, discover_as_metadata};
pub use prm::{ProtectedResourceMetadata, discover_prm};

use mcp_core::{Error, ErrorKind};
use url::Url;

use crate::endpoint_safety;

const PROTOCOL_VERSION_HEADER: &str = "Mcp-Protocol-Version";

/// Shared per-URL fetch policy for both PRM and AS metadata: 200 with
/// valid JSON succeeds and stops; 200 with invalid JSON, or any 4xx,
/// moves on to the next URL; 5xx or a transport failure stops the whole
/// chain immediately.
pub(crate) enum FetchOutcome<T> {
    Found(T),
    TryNext,
    Abort(Error),
}

pub(crate) async fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    protocol_version: &str,
) -> FetchOutcome<T> {
    if let Err(error) = endpoint_safety::validate(url) {
        return FetchOutcome::Abort(error);
    }

    let response = match client.get(url.clone()).header("Accept", "application/json").header(PROTOCOL_VERSION_HEADER, protocol_version).send().await {
        Ok(response) => response,
        Err(error) => return FetchOutcome::Abort(Error::new(ErrorKind::DiscoveryFailed, error.to_string())),
    };

    let status = response.status();
    if status.is_server_error() {
        return FetchOutcome::Abort(Error::new(ErrorKind::DiscoveryFailed, format!("{url} returned {status}")));
    }
    if status.is_client_error() {
        return FetchOutcome::TryNext;
    }
    if !status.is_success() {
        return FetchOutcome::TryNext;
    }

    match response.json::<T>().await {
        Ok(value) => FetchOutcome::Found(value),
        Err(_) => FetchOutcome::TryNext,
    }
}

/// Validate that the `issuer` an AS metadata document claims matches the
/// authorization server URL used to discover it, per RFC 8414 §3
/// (trailing slashes normalized on both sides before comparing).
pub(crate) fn validate_issuer(issuer: &str, as_url: &Url) -> Result<(), Error> {
    let normalize = |s: &str| s.trim_end_matches('/').to_string();
    if normalize(issuer) == normalize(as_url.as_str()) {
        Ok(())
    } else {
        Err(Error::new(
            ErrorKind::DiscoveryFailed,
            format!("issuer mismatch: metadata claims `{issuer}`, expected `{as_url}`"),
        ))
    }
}
