//! Serves this resource server's own `oauth-protected-resource`
//! well-known document (RFC 9728).

use super::middleware::{HttpResponse, ResourceServerConfig};

/// The well-known path this resource is served under:
/// `/.well-known/oauth-protected-resource` plus the resource's own path,
/// if it has a non-root one.
#[must_use]
pub fn well_known_path(config: &ResourceServerConfig) -> String {
    let path = config.resource.path();
    if path.is_empty() || path == "/" {
        "/.well-known/oauth-protected-resource".to_string()
    } else {
        format!("/.well-known/oauth-protected-resource{path}")
    }
}

/// Build the PRM response: JSON body with stable key ordering and a
/// one-hour cacheable `Cache-Control`.
#[must_use]
pub fn serve_protected_resource_metadata(config: &ResourceServerConfig, authorization_servers: &[String]) -> HttpResponse {
    let mut body = serde_json::Map::new();
    body.insert("resource".to_string(), serde_json::Value::String(config.resource.to_string()));
    if !authorization_servers.is_empty() {
        body.insert(
            "authorization_servers".to_string(),
            serde_json::Value::Array(authorization_servers.iter().cloned().map(serde_json::Value::String).collect()),
        );
    }
    if let Some(scopes) = &config.scopes_supported {
        body.insert("scopes_supported".to_string(), serde_json::Value::Array(scopes.iter().cloned().map(serde_json::Value::String).collect()));
    }

    HttpResponse {
        status: 200,
        headers: vec![("Content-Type".to_string(), "application/json".to_string()), ("Cache-Control".to_string(), "public, max-age=3600".to_string())],
        body: serde_json::Value::Object(body).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    #[test]
    fn well_known_path_appends_non_root_resource_path() {
        let config = ResourceServerConfig { resource: Url::parse("https://api.example.com/mcp").unwrap(), scopes_supported: None, resource_metadata_url: None };
        assert_eq!(well_known_path(&config), "/.well-known/oauth-protected-resource/mcp");
    }

    #[test]
    fn well_known_path_is_bare_for_root_resource() {
        let config = ResourceServerConfig { resource: Url::parse("https://api.example.com/").unwrap(), scopes_supported: None, resource_metadata_url: None };
        assert_eq!(well_known_path(&config), "/.well-known/oauth-protected-resource");
    }

    #[test]
    fn response_carries_cache_control_and_omits_absent_optionals() {
        let config = ResourceServerConfig { resource: Url::parse("https://api.example.com/mcp").unwrap(), scopes_supported: None, resource_metadata_url: None };
        let response = serve_protected_resource_metadata(&config, &["https://as.example.com".to_string()]);
        assert!(response.headers.iter().any(|(k, v)| k == "Cache-Control" && v == "public, max-age=3600"));
        assert!(!response.body.contains("scopes_supported"));
    }
}
