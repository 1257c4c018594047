//! Client authentication method selection (RFC 8414's
//! `token_endpoint_auth_methods_supported`) and how each method attaches
//! credentials to a token-endpoint request.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

const UNRESERVED_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// A method a token-endpoint request can authenticate with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthMethod {
    Basic,
    Post,
    None,
}

impl ClientAuthMethod {
    fn wire_name(self) -> &'static str {
        match self {
            Self::Basic => "client_secret_basic",
            Self::Post => "client_secret_post",
            Self::None => "none",
        }
    }
}

/// Default per RFC 8414 when the server omits
/// `token_endpoint_auth_methods_supported`.
const DEFAULT_SERVER_SUPPORTED: &str = "client_secret_basic";

/// Select the client authentication method to use, given what the server
/// supports, the client's stated preference, and whether a client secret
/// exists at all.
#[must_use]
pub fn select(
    server_supported: Option<&[String]>,
    preference: ClientAuthMethod,
    has_secret: bool,
) -> ClientAuthMethod {
    let supported: Vec<&str> =
        server_supported.map(|m| m.iter().map(String::as_str).collect()).unwrap_or_else(|| vec![DEFAULT_SERVER_SUPPORTED]);

    if !has_secret {
        return ClientAuthMethod::None;
    }

    if supported.contains(&preference.wire_name()) {
        return preference;
    }

    let candidates = if matches!(preference, ClientAuthMethod::None) {
        [ClientAuthMethod::None, ClientAuthMethod::Post, ClientAuthMethod::Basic]
    } else {
        [ClientAuthMethod::Basic, ClientAuthMethod::Post, ClientAuthMethod::None]
    };
    candidates.into_iter().find(|c| supported.contains(&c.wire_name())).unwrap_or(ClientAuthMethod::None)
}

/// The credentials to attach to a token-endpoint request: an optional
/// `Authorization` header value, plus form-body parameters to add.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub authorization_header: Option<String>,
    pub body_params: Vec<(String, String)>,
}

/// Render `method`'s credential attachment for `client_id`/`client_secret`.
#[must_use]
pub fn apply(method: ClientAuthMethod, client_id: &str, client_secret: Option<&str>) -> Credentials {
    match method {
        ClientAuthMethod::Basic => {
            let secret = client_secret.unwrap_or_default();
            let encoded_id = utf8_percent_encode(client_id, UNRESERVED_ENCODE_SET).to_string();
            let encoded_secret = utf8_percent_encode(secret, UNRESERVED_ENCODE_SET).to_string();
            let basic = BASE64_STANDARD.encode(format!("{encoded_id}:{encoded_secret}"));
            Credentials { authorization_header: Some(format!("Basic {basic}")), body_params: Vec::new() }
        }
        ClientAuthMethod::Post => {
            let mut body_params = vec![("client_id".to_string(), client_id.to_string())];
            if let Some(secret) = client_secret {
                body_params.push(("client_secret".to_string(), secret.to_string()));
            }
            Credentials { authorization_header: None, body_params }
        }
        ClientAuthMethod::None => {
            Credentials { authorization_header: None, body_params: vec![("client_id".to_string(), client_id.to_string())] }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_wins_when_server_supports_it() {
        let method = select(Some(&["client_secret_post".to_string()]), ClientAuthMethod::Post, true);
        assert_eq!(method, ClientAuthMethod::Post);
    }

    #[test]
    fn confidential_fallback_order_is_basic_post_none() {
        let method = select(Some(&["client_secret_post".to_string(), "none".to_string()]), ClientAuthMethod::Basic, true);
        assert_eq!(method, ClientAuthMethod::Post);
    }

    #[test]
    fn no_secret_forces_none() {
        let method = select(Some(&["client_secret_basic".to_string()]), ClientAuthMethod::Basic, false);
        assert_eq!(method, ClientAuthMethod::None);
    }

    #[test]
    fn absent_server_list_defaults_to_basic_only() {
        let method = select(None, ClientAuthMethod::Post, true);
        assert_eq!(method, ClientAuthMethod::Basic);
    }

    #[test]
    fn basic_auth_header_uses_unreserved_percent_encoding() {
        let creds = apply(ClientAuthMethod::Basic, "id@host", Some("s:e/c+ret"));
        assert!(creds.authorization_header.unwrap().starts_with("Basic "));
        assert!(creds.body_params.is_empty());
    }

    #[test]
    fn post_auth_puts_credentials_in_body() {
        let creds = apply(ClientAuthMethod::Post, "id", Some("secret"));
        assert!(creds.authorization_header.is_none());
        assert_eq!(creds.body_params, vec![("client_id".to_string(), "id".to_string()), ("client_secret".to_string(), "secret".to_string())]);
    }
}
