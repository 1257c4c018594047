//! Adapts an [`OAuthClientProvider`] to the HTTP transport's
//! [`HttpAuthProvider`] so the transport's 401/403 retry logic can drive
//! any of the three client providers.

use std::sync::Arc;

use async_trait::async_trait;
use mcp_transport_http::{HttpAuthProvider, TransportError, TransportResult};

use crate::providers::{OAuthClientProvider, UnauthorizedContext};
use crate::www_authenticate;

/// Wraps an [`OAuthClientProvider`] for use as a transport's auth
/// provider.
#[derive(Clone)]
pub struct OAuthHttpBridge {
    provider: Arc<dyn OAuthClientProvider>,
}

impl std::fmt::Debug for OAuthHttpBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthHttpBridge").finish_non_exhaustive()
    }
}

impl OAuthHttpBridge {
    #[must_use]
    pub fn new(provider: Arc<dyn OAuthClientProvider>) -> Self {
        Self { provider }
    }

    async fn reauthorize(&self, www_authenticate: Option<&str>) -> TransportResult<String> {
        let challenge = www_authenticate.and_then(www_authenticate::find_bearer);
        let ctx = UnauthorizedContext {
            scope: challenge.as_ref().and_then(|c| c.scope().map(str::to_string)),
            resource_metadata_url: challenge.as_ref().and_then(|c| c.resource_metadata()).and_then(|url| url::Url::parse(url).ok()),
            challenge,
        };
        let tokens = self.provider.handle_unauthorized(&ctx).await.map_err(|e| TransportError::AuthenticationFailed(e.to_string()))?;
        Ok(tokens.access_token)
    }
}

#[async_trait]
impl HttpAuthProvider for OAuthHttpBridge {
    async fn token(&self) -> Option<String> {
        self.provider.tokens().await.map(|t| t.access_token)
    }

    async fn on_unauthorized(&self, www_authenticate: Option<&str>) -> TransportResult<String> {
        self.reauthorize(www_authenticate).await
    }

    async fn on_forbidden(&self, www_authenticate: Option<&str>) -> TransportResult<String> {
        self.reauthorize(www_authenticate).await
    }
}
