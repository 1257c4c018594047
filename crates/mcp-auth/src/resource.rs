//! Resource URL canonicalization and hierarchical matching (RFC 8707).

use url::Url;

/// Canonicalize a resource URL: lowercase scheme and host, drop the
/// fragment, drop a default port (80/http, 443/https), keep path/query/
/// trailing slash as-is.
#[must_use]
pub fn canonicalize(url: &Url) -> Url {
    let mut canonical = url.clone();
    let _ = canonical.set_scheme(&url.scheme().to_lowercase());
    if let Some(host) = url.host_str() {
        let _ = canonical.set_host(Some(&host.to_lowercase()));
    }
    canonical.set_fragment(None);
    let is_default_port =
        matches!((canonical.scheme(), canonical.port()), ("http", Some(80)) | ("https", Some(443)));
    if is_default_port {
        let _ = canonical.set_port(None);
    }
    canonical
}

fn effective_port(url: &Url) -> Option<u16> {
    url.port_or_known_default()
}

/// Whether `requested` is covered by the configured resource `config`:
/// same scheme, same host (case-insensitive), same effective port, and
/// `requested`'s path (with a trailing `/` appended) has `config`'s path
/// plus a trailing `/` as a prefix. An empty configured path matches any
/// path.
#[must_use]
pub fn matches(requested: &Url, config: &Url) -> bool {
    if requested.scheme() != config.scheme() {
        return false;
    }
    let same_host = match (requested.host_str(), config.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };
    if !same_host || effective_port(requested) != effective_port(config) {
        return false;
    }

    let config_path = config.path();
    if config_path.is_empty() || config_path == "/" {
        return true;
    }

    let requested_with_slash = format!("{}/", requested.path());
    let config_prefix = format!("{}/", config_path.trim_end_matches('/'));
    requested_with_slash.starts_with(&config_prefix)
}

/// Select the resource to send in the `resource` parameter: PRM's
/// `resource`, if it is a hierarchical parent of the canonical server
/// URL, else the canonical server URL itself.
#[must_use]
pub fn select_resource(prm_resource: Option<&Url>, canonical_server_url: &Url) -> Url {
    if let Some(prm_resource) = prm_resource
        && matches(canonical_server_url, prm_resource)
    {
        return prm_resource.clone();
    }
    canonical_server_url.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_drops_default_port_and_fragment() {
        let url = Url::parse("HTTPS://Example.COM:443/a/b#frag").unwrap();
        let canonical = canonicalize(&url);
        assert_eq!(canonical.as_str(), "https://example.com/a/b");
    }

    #[test]
    fn canonicalize_keeps_non_default_port() {
        let url = Url::parse("https://example.com:8443/a").unwrap();
        assert_eq!(canonicalize(&url).port(), Some(8443));
    }

    #[test]
    fn hierarchical_match_requires_path_prefix_on_segment_boundary() {
        let config = Url::parse("https://example.com/api").unwrap();
        assert!(matches(&Url::parse("https://example.com/api").unwrap(), &config));
        assert!(matches(&Url::parse("https://example.com/api/v1").unwrap(), &config));
        assert!(!matches(&Url::parse("https://example.com/api-evil").unwrap(), &config));
    }

    #[test]
    fn empty_configured_path_matches_anything() {
        let config = Url::parse("https://example.com").unwrap();
        assert!(matches(&Url::parse("https://example.com/anything").unwrap(), &config));
    }

    #[test]
    fn select_resource_prefers_prm_when_it_is_a_parent() {
        let server = Url::parse("https://example.com/api/v1/mcp").unwrap();
        let prm = Url::parse("https://example.com/api").unwrap();
        assert_eq!(select_resource(Some(&prm), &server), prm);
    }

    #[test]
    fn select_resource_falls_back_to_server_url() {
        let server = Url::parse("https://example.com/mcp").unwrap();
        let prm = Url::parse("https://other.example.com/").unwrap();
        assert_eq!(select_resource(Some(&prm), &server), server);
    }
}
