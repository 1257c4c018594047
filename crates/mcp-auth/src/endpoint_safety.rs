//! SSRF-safe endpoint validation: which URLs this client is willing to
//! issue an HTTP request against, applied to every URL derived from
//! discovered metadata before it is fetched or redirected to.

use mcp_core::{Error, ErrorKind};
use url::Url;

const LOCAL_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// `https` is always accepted. `http` is accepted only when the host is
/// exactly `localhost`, `127.0.0.1`, or `::1`. Everything else
/// (`javascript:`, `data:`, arbitrary `http` hosts, ...) is rejected.
pub fn validate(url: &Url) -> Result<(), Error> {
    match url.scheme() {
        "https" => Ok(()),
        "http" => {
            let host = url.host_str().unwrap_or_default();
            if LOCAL_HOSTS.contains(&host) {
                Ok(())
            } else {
                Err(Error::new(
                    ErrorKind::DiscoveryFailed,
                    format!("http endpoints are only allowed for localhost, got {host}"),
                ))
            }
        }
        other => Err(Error::new(ErrorKind::DiscoveryFailed, format!("unsafe endpoint scheme: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_is_always_allowed() {
        assert!(validate(&Url::parse("https://example.com/token").unwrap()).is_ok());
    }

    #[test]
    fn http_localhost_is_allowed() {
        assert!(validate(&Url::parse("http://localhost:8080/token").unwrap()).is_ok());
        assert!(validate(&Url::parse("http://127.0.0.1:8080/token").unwrap()).is_ok());
    }

    #[test]
    fn http_elsewhere_is_rejected() {
        assert!(validate(&Url::parse("http://example.com/token").unwrap()).is_err());
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(validate(&Url::parse("javascript:alert(1)").unwrap()).is_err());
        assert!(validate(&Url::parse("data:text/plain,hi").unwrap()).is_err());
    }
}
