//! Private-key-JWT provider (RFC 7523): the client authenticates with a
//! signed JWT assertion instead of a shared secret. Signing the
//! assertion is the embedder's problem — this provider only knows how
//! to ask for one and attach it to the request.

use std::sync::Arc;

use async_trait::async_trait;
use mcp_core::{Error, ErrorKind};
use url::Url;

use mcp_wire::encode_form;

use crate::discovery::{AsMetadata, discover_as_metadata, discover_prm};
use crate::refresh::{self, Assertion};
use crate::resource;
use crate::token::TokenSet;

use super::{OAuthClientProvider, TokenStorage, UnauthorizedContext};

/// Produces a fresh signed JWT client assertion for `client_id`,
/// addressed to `token_endpoint` as its audience. Called once per token
/// request (including refreshes), since assertions are meant to be
/// short-lived and single-use.
#[async_trait]
pub trait AssertionCallback: Send + Sync {
    async fn assertion(&self, client_id: &str, token_endpoint: &str) -> Result<String, Error>;
}

/// Private-key-JWT provider. `client_id` is assumed pre-registered with
/// the authorization server out of band (the server already holds the
/// corresponding public key or JWKS URL); this provider does not run
/// dynamic client registration.
pub struct PrivateKeyJwtProvider {
    http: reqwest::Client,
    server_url: Url,
    client_id: String,
    scope: Option<String>,
    assertion: Arc<dyn AssertionCallback>,
    storage: Arc<dyn TokenStorage>,
    protocol_version: String,
}

impl PrivateKeyJwtProvider {
    #[must_use]
    pub fn new(server_url: Url, client_id: impl Into<String>, assertion: Arc<dyn AssertionCallback>, storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url,
            client_id: client_id.into(),
            scope: None,
            assertion,
            storage,
            protocol_version: "2025-06-18".to_string(),
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    async fn discover(&self) -> Result<(AsMetadata, Url), Error> {
        let canonical_server_url = resource::canonicalize(&self.server_url);
        let prm = discover_prm(&self.http, &canonical_server_url, None, &self.protocol_version).await?;
        let prm_resource = Url::parse(&prm.resource).map_err(|e| Error::new(ErrorKind::DiscoveryFailed, format!("invalid PRM resource: {e}")))?;
        if !resource::matches(&canonical_server_url, &prm_resource) {
            return Err(Error::resource_mismatch(prm_resource.to_string(), canonical_server_url.to_string()));
        }
        let as_url_str = prm
            .authorization_servers
            .as_ref()
            .and_then(|servers| servers.first())
            .ok_or_else(|| Error::new(ErrorKind::DiscoveryFailed, "protected resource metadata lists no authorization servers"))?;
        let as_url = Url::parse(as_url_str).map_err(|e| Error::new(ErrorKind::DiscoveryFailed, format!("invalid authorization server URL: {e}")))?;
        let as_metadata = discover_as_metadata(&self.http, &as_url, &self.protocol_version).await?;
        let resource = resource::select_resource(Some(&prm_resource), &canonical_server_url);
        Ok((as_metadata, resource))
    }

    async fn request_token(&self, as_metadata: &AsMetadata, resource: &Url) -> Result<TokenSet, Error> {
        let jwt = self.assertion.assertion(&self.client_id, &as_metadata.token_endpoint).await?;
        let resource_str = resource.to_string();
        let mut form = vec![
            ("grant_type".to_string(), "client_credentials".to_string()),
            ("resource".to_string(), resource_str),
            ("client_assertion_type".to_string(), "urn:ietf:params:oauth:client-assertion-type:jwt-bearer".to_string()),
            ("client_assertion".to_string(), jwt),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope".to_string(), scope.clone()));
        }
        let body = encode_form(form.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let response = self
            .http
            .post(&as_metadata.token_endpoint)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::new(ErrorKind::AuthorizationFailed, format!("token request failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            let tokens: TokenSet = response.json().await.map_err(|e| Error::new(ErrorKind::AuthorizationFailed, format!("invalid token response: {e}")))?;
            tokens.normalized()
        } else {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let error = body.get("error").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            Err(Error::new(ErrorKind::AuthorizationFailed, format!("private_key_jwt grant failed with status {status}: {error}")))
        }
    }
}

#[async_trait]
impl OAuthClientProvider for PrivateKeyJwtProvider {
    async fn tokens(&self) -> Option<TokenSet> {
        let tokens = self.storage.load_tokens().await?;
        if !tokens.is_near_expiry() {
            return Some(tokens);
        }

        let Ok((as_metadata, resource)) = self.discover().await else { return Some(tokens) };

        if let Some(refresh_token) = &tokens.refresh_token {
            let Ok(jwt) = self.assertion.assertion(&self.client_id, &as_metadata.token_endpoint).await else { return Some(tokens) };
            if let Ok(fresh) = refresh::refresh(&self.http, &as_metadata.token_endpoint, refresh_token, Some(&resource), None, Some(&Assertion { jwt })).await {
                self.storage.store_tokens(&fresh).await;
                return Some(fresh);
            }
        }

        match self.request_token(&as_metadata, &resource).await {
            Ok(fresh) => {
                self.storage.store_tokens(&fresh).await;
                Some(fresh)
            }
            Err(_) => Some(tokens),
        }
    }

    async fn handle_unauthorized(&self, _ctx: &UnauthorizedContext) -> Result<TokenSet, Error> {
        let (as_metadata, resource) = self.discover().await?;
        let tokens = self.request_token(&as_metadata, &resource).await?;
        self.storage.store_tokens(&tokens).await;
        Ok(tokens)
    }
}
