//! Client-credentials provider (RFC 6749 §4.4). No user interaction and
//! no authorization code: the registered client authenticates itself
//! directly at the token endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use mcp_core::{Error, ErrorKind};
use url::Url;

use mcp_wire::encode_form;

use crate::client_auth::{self, ClientAuthMethod};
use crate::dcr::{self, ClientInfo, ClientMetadata};
use crate::discovery::{AsMetadata, discover_as_metadata, discover_prm};
use crate::refresh;
use crate::resource;
use crate::token::TokenSet;

use super::{OAuthClientProvider, TokenStorage, UnauthorizedContext};

/// Client-credentials provider, scoped to a single MCP server URL.
pub struct ClientCredentialsProvider {
    http: reqwest::Client,
    server_url: Url,
    client_name: String,
    scope: Option<String>,
    client_auth_preference: ClientAuthMethod,
    storage: Arc<dyn TokenStorage>,
    protocol_version: String,
}

impl ClientCredentialsProvider {
    #[must_use]
    pub fn new(server_url: Url, client_name: impl Into<String>, storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url,
            client_name: client_name.into(),
            scope: None,
            client_auth_preference: ClientAuthMethod::Basic,
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

    async fn client_info(&self, as_metadata: &AsMetadata) -> Result<ClientInfo, Error> {
        if let Some(info) = self.storage.load_client_info().await {
            return Ok(info);
        }
        let info = self.register(as_metadata).await?;
        self.storage.store_client_info(&info).await;
        Ok(info)
    }

    async fn register(&self, as_metadata: &AsMetadata) -> Result<ClientInfo, Error> {
        let metadata = ClientMetadata {
            redirect_uris: Vec::new(),
            client_name: self.client_name.clone(),
            scope: self.scope.clone(),
            grant_types: vec!["client_credentials".to_string()],
            response_types: Vec::new(),
            token_endpoint_auth_method: "client_secret_basic".to_string(),
        };
        dcr::register(&self.http, as_metadata, &metadata).await
    }

    async fn request_token(&self, as_metadata: &AsMetadata, resource: &Url, client_info: &ClientInfo) -> Result<TokenSet, Error> {
        let auth_method = client_auth::select(as_metadata.token_endpoint_auth_methods_supported.as_deref(), self.client_auth_preference, client_info.client_secret.is_some());
        let resource_str = resource.to_string();
        let mut form: Vec<(&str, &str)> = vec![("grant_type", "client_credentials"), ("resource", &resource_str)];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope));
        }
        let credentials = client_auth::apply(auth_method, &client_info.client_id, client_info.client_secret.as_deref());
        let body_params: Vec<(String, String)> = credentials.body_params;
        for (key, value) in &body_params {
            form.push((key, value));
        }
        let body = encode_form(form);

        let mut request = self.http.post(&as_metadata.token_endpoint).header("Content-Type", "application/x-www-form-urlencoded");
        if let Some(header) = &credentials.authorization_header {
            request = request.header("Authorization", header);
        }
        let response = request.body(body).send().await.map_err(|e| Error::new(ErrorKind::AuthorizationFailed, format!("token request failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            let tokens: TokenSet = response.json().await.map_err(|e| Error::new(ErrorKind::AuthorizationFailed, format!("invalid token response: {e}")))?;
            tokens.normalized()
        } else {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let error = body.get("error").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            Err(Error::new(ErrorKind::AuthorizationFailed, format!("client_credentials grant failed with status {status}: {error}")))
        }
    }
}

#[async_trait]
impl OAuthClientProvider for ClientCredentialsProvider {
    async fn tokens(&self) -> Option<TokenSet> {
        let tokens = self.storage.load_tokens().await?;
        if !tokens.is_near_expiry() {
            return Some(tokens);
        }

        let Ok((as_metadata, resource)) = self.discover().await else { return Some(tokens) };
        let Some(client_info) = self.storage.load_client_info().await else { return Some(tokens) };

        if let Some(refresh_token) = &tokens.refresh_token {
            let auth_method = client_auth::select(as_metadata.token_endpoint_auth_methods_supported.as_deref(), self.client_auth_preference, client_info.client_secret.is_some());
            if let Ok(fresh) = refresh::refresh(
                &self.http,
                &as_metadata.token_endpoint,
                refresh_token,
                Some(&resource),
                Some((auth_method, &client_info.client_id, client_info.client_secret.as_deref())),
                None,
            )
            .await
            {
                self.storage.store_tokens(&fresh).await;
                return Some(fresh);
            }
        }

        match self.request_token(&as_metadata, &resource, &client_info).await {
            Ok(fresh) => {
                self.storage.store_tokens(&fresh).await;
                Some(fresh)
            }
            Err(_) => Some(tokens),
        }
    }

    async fn handle_unauthorized(&self, _ctx: &UnauthorizedContext) -> Result<TokenSet, Error> {
        let (as_metadata, resource) = self.discover().await?;
        let client_info = self.client_info(&as_metadata).await?;

        let result = self.request_token(&as_metadata, &resource, &client_info).await;
        let tokens = match result {
            Ok(tokens) => tokens,
            Err(error) if error.message.contains("invalid_client") => {
                self.storage.clear_client_info().await;
                let fresh_client = self.register(&as_metadata).await?;
                self.storage.store_client_info(&fresh_client).await;
                self.request_token(&as_metadata, &resource, &fresh_client).await?
            }
            Err(error) => return Err(error),
        };

        self.storage.store_tokens(&tokens).await;
        Ok(tokens)
    }
}
