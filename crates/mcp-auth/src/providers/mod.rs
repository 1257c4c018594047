//! OAuth client providers: the three flows the core ships (authorization
//! code + PKCE, client-credentials, private-key-JWT) behind one shared
//! interface the HTTP transport drives on 401/403.

mod authorization_code;
mod client_credentials;
mod private_key_jwt;

pub use authorization_code::{AuthorizationCodeProvider, AuthorizationRedirect, RedirectHandler};
pub use client_credentials::ClientCredentialsProvider;
pub use private_key_jwt::{AssertionCallback, PrivateKeyJwtProvider};

use async_trait::async_trait;
use mcp_core::Error;
use url::Url;

use crate::token::TokenSet;
use crate::www_authenticate::Challenge;

/// What triggered re-authentication: the parsed challenge (if any), the
/// `resource_metadata` URL it carried, and the scope it requested.
#[derive(Debug, Clone, Default)]
pub struct UnauthorizedContext {
    pub challenge: Option<Challenge>,
    pub resource_metadata_url: Option<Url>,
    pub scope: Option<String>,
}

/// Every OAuth client provider implements this: hand back a cached token
/// if one is usable, and run the provider-specific flow to get a fresh
/// one when challenged.
#[async_trait]
pub trait OAuthClientProvider: Send + Sync {
    /// The currently usable token set, refreshing proactively if it's
    /// near expiry and a refresh token is available. Returns `None` if
    /// there's no usable token (caller must go through
    /// [`OAuthClientProvider::handle_unauthorized`]).
    async fn tokens(&self) -> Option<TokenSet>;

    /// Run the provider's flow to obtain a fresh token set in response
    /// to a 401/403, and persist it via the configured storage.
    async fn handle_unauthorized(&self, ctx: &UnauthorizedContext) -> Result<TokenSet, Error>;
}

/// User-supplied persistence for tokens and registered-client
/// information. The core never writes these to disk itself.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn load_tokens(&self) -> Option<TokenSet>;
    async fn store_tokens(&self, tokens: &TokenSet);
    async fn load_client_info(&self) -> Option<crate::dcr::ClientInfo>;
    async fn store_client_info(&self, info: &crate::dcr::ClientInfo);
    async fn clear_client_info(&self);
}
