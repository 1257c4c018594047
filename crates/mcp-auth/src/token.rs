//! The token set returned by every OAuth flow, and the proactive-refresh
//! policy shared by all client providers.

use std::time::{SystemTime, UNIX_EPOCH};

use mcp_core::{Error, ErrorKind};
use serde::{Deserialize, Serialize};

/// Tokens are refreshed proactively once fewer than this many seconds
/// remain before expiry.
pub const NEAR_EXPIRY_WINDOW_SECS: u64 = 60;

/// `{access_token, token_type, expires_in?, scope?, refresh_token?, id_token?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Not part of the wire format: the local clock reading at the
    /// moment this token set was received, used to compute expiry.
    #[serde(skip)]
    pub issued_at: Option<u64>,
}

impl TokenSet {
    /// Normalize `token_type` to the canonical `"Bearer"` casing,
    /// rejecting anything that isn't case-insensitively `bearer`.
    pub fn normalized(mut self) -> Result<Self, Error> {
        if !self.token_type.eq_ignore_ascii_case("bearer") {
            return Err(Error::new(
                ErrorKind::OAuthUnrecognized,
                format!("unsupported token_type: {}", self.token_type),
            ));
        }
        self.token_type = "Bearer".to_string();
        if self.issued_at.is_none() {
            self.issued_at = Some(now_unix());
        }
        Ok(self)
    }

    fn expires_at(&self) -> Option<u64> {
        let issued_at = self.issued_at?;
        let expires_in = self.expires_in?;
        Some(issued_at + expires_in)
    }

    /// Whether fewer than [`NEAR_EXPIRY_WINDOW_SECS`] remain before
    /// expiry. Tokens with no `expires_in` are never considered near
    /// expiry (they're treated as long-lived).
    #[must_use]
    pub fn is_near_expiry(&self) -> bool {
        match self.expires_at() {
            Some(expires_at) => now_unix() + NEAR_EXPIRY_WINDOW_SECS >= expires_at,
            None => false,
        }
    }
}

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in: Option<u64>, issued_at: Option<u64>) -> TokenSet {
        TokenSet {
            access_token: "at".to_string(),
            token_type: "bearer".to_string(),
            expires_in,
            scope: None,
            refresh_token: None,
            id_token: None,
            issued_at,
        }
    }

    #[test]
    fn token_type_is_normalized_case_insensitively() {
        let normalized = token(None, None).normalized().unwrap();
        assert_eq!(normalized.token_type, "Bearer");
    }

    #[test]
    fn unrecognized_token_type_fails() {
        let mut t = token(None, None);
        t.token_type = "mac".to_string();
        assert!(t.normalized().is_err());
    }

    #[test]
    fn near_expiry_detection() {
        let now = now_unix();
        let fresh = token(Some(3600), Some(now)).normalized().unwrap();
        assert!(!fresh.is_near_expiry());

        let expiring = token(Some(30), Some(now)).normalized().unwrap();
        assert!(expiring.is_near_expiry());
    }

    #[test]
    fn no_expires_in_is_never_near_expiry() {
        let t = token(None, Some(now_unix())).normalized().unwrap();
        assert!(!t.is_near_expiry());
    }
}
