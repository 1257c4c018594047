//! Client ID Metadata Documents (SEP-991): using a URL as a client_id
//! instead of registering with the authorization server.

use mcp_core::{Error, ErrorKind};
use url::Url;

use crate::discovery::AsMetadata;

/// Whether `url` is usable as a CIMD client_id: HTTPS, with a non-root
/// path.
#[must_use]
pub fn is_valid_cimd_url(url: &Url) -> bool {
    url.scheme() == "https" && !matches!(url.path(), "" | "/")
}

/// Decide whether to use `cimd_url` as the client_id for this AS,
/// instead of dynamic client registration.
pub fn select_cimd(cimd_url: Option<&Url>, as_metadata: &AsMetadata) -> Result<Option<Url>, Error> {
    let Some(cimd_url) = cimd_url else { return Ok(None) };

    if as_metadata.client_id_metadata_document_supported != Some(true) {
        return Ok(None);
    }
    if !is_valid_cimd_url(cimd_url) {
        return Err(Error::new(ErrorKind::RegistrationFailed, format!("`{cimd_url}` is not a valid CIMD URL: must be https with a non-root path")));
    }
    Ok(Some(cimd_url.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(supported: Option<bool>) -> AsMetadata {
        AsMetadata {
            issuer: "https://as.example.com".to_string(),
            authorization_endpoint: "https://as.example.com/authorize".to_string(),
            token_endpoint: "https://as.example.com/token".to_string(),
            registration_endpoint: None,
            scopes_supported: None,
            response_types_supported: None,
            code_challenge_methods_supported: None,
            token_endpoint_auth_methods_supported: None,
            client_id_metadata_document_supported: supported,
        }
    }

    #[test]
    fn https_with_path_is_valid() {
        assert!(is_valid_cimd_url(&Url::parse("https://client.example.com/app.json").unwrap()));
        assert!(!is_valid_cimd_url(&Url::parse("https://client.example.com/").unwrap()));
        assert!(!is_valid_cimd_url(&Url::parse("http://client.example.com/app.json").unwrap()));
    }

    #[test]
    fn skipped_when_as_does_not_advertise_support() {
        let url = Url::parse("https://client.example.com/app.json").unwrap();
        assert!(select_cimd(Some(&url), &metadata(None)).unwrap().is_none());
        assert!(select_cimd(Some(&url), &metadata(Some(false))).unwrap().is_none());
    }

    #[test]
    fn used_when_supported_and_valid() {
        let url = Url::parse("https://client.example.com/app.json").unwrap();
        let selected = select_cimd(Some(&url), &metadata(Some(true))).unwrap();
        assert_eq!(selected, Some(url));
    }

    #[test]
    fn invalid_url_is_rejected_even_when_supported() {
        let url = Url::parse("https://client.example.com/").unwrap();
        assert!(select_cimd(Some(&url), &metadata(Some(true))).is_err());
    }
}
