//! Authorization code + PKCE provider (RFC 6749 §4.1, RFC 7636).

use std::sync::Arc;

use async_trait::async_trait;
use mcp_core::{Error, ErrorKind};
use url::Url;

use mcp_wire::encode_form;

use crate::client_auth::{self, ClientAuthMethod};
use crate::dcr::{self, ClientMetadata};
use crate::discovery::{discover_as_metadata, discover_prm};
use crate::pkce::{self, Pkce};
use crate::refresh;
use crate::resource;
use crate::token::TokenSet;

use super::{OAuthClientProvider, TokenStorage, UnauthorizedContext};

/// The code and state a redirect handler recovered from the
/// authorization server's callback.
#[derive(Debug, Clone)]
pub struct AuthorizationRedirect {
    pub code: String,
    pub state: String,
}

/// Drives the user through the authorization step: open
/// `authorization_url` however the embedding application does that (a
/// browser, a webview, a device-linked prompt), then await the
/// callback and hand back the code/state it carried.
#[async_trait]
pub trait RedirectHandler: Send + Sync {
    async fn redirect(&self, authorization_url: Url) -> Result<AuthorizationRedirect, Error>;
}

/// Authorization-code-with-PKCE provider. One instance is scoped to a
/// single MCP server URL.
pub struct AuthorizationCodeProvider {
    http: reqwest::Client,
    server_url: Url,
    redirect_uri: String,
    client_name: String,
    scope: Option<String>,
    client_auth_preference: ClientAuthMethod,
    cimd_url: Option<Url>,
    storage: Arc<dyn TokenStorage>,
    redirect_handler: Arc<dyn RedirectHandler>,
    protocol_version: String,
}

impl AuthorizationCodeProvider {
    #[must_use]
    pub fn new(
        server_url: Url,
        redirect_uri: impl Into<String>,
        client_name: impl Into<String>,
        storage: Arc<dyn TokenStorage>,
        redirect_handler: Arc<dyn RedirectHandler>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url,
            redirect_uri: redirect_uri.into(),
            client_name: client_name.into(),
            scope: None,
            client_auth_preference: ClientAuthMethod::Basic,
            cimd_url: None,
            storage,
            redirect_handler,
            protocol_version: "2025-06-18".to_string(),
        }
    }

    #[must_use]
    pub fn with_cimd_url(mut self, url: Url) -> Self {
        self.cimd_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    async fn client_info(&self, as_metadata: &crate::discovery::AsMetadata) -> Result<dcr::ClientInfo, Error> {
        if let Some(cimd_url) = crate::cimd::select_cimd(self.cimd_url.as_ref(), as_metadata)? {
            return Ok(dcr::ClientInfo { client_id: cimd_url.to_string(), client_secret: None });
        }
        if let Some(info) = self.storage.load_client_info().await {
            return Ok(info);
        }
        let info = self.register(as_metadata).await?;
        self.storage.store_client_info(&info).await;
        Ok(info)
    }

    async fn register(&self, as_metadata: &crate::discovery::AsMetadata) -> Result<dcr::ClientInfo, Error> {
        let metadata = ClientMetadata {
            redirect_uris: vec![self.redirect_uri.clone()],
            client_name: self.client_name.clone(),
            scope: self.scope.clone(),
            grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: auth_method_wire_name(self.client_auth_preference).to_string(),
        };
        dcr::register(&self.http, as_metadata, &metadata).await
    }
}

fn auth_method_wire_name(method: ClientAuthMethod) -> &'static str {
    match method {
        ClientAuthMethod::Basic => "client_secret_basic",
        ClientAuthMethod::Post => "client_secret_post",
        ClientAuthMethod::None => "none",
    }
}

#[async_trait]
impl OAuthClientProvider for AuthorizationCodeProvider {
    async fn tokens(&self) -> Option<TokenSet> {
        let tokens = self.storage.load_tokens().await?;
        if !tokens.is_near_expiry() {
            return Some(tokens);
        }
        let Some(refresh_token) = tokens.refresh_token.clone() else {
            return None;
        };

        let canonical_server_url = resource::canonicalize(&self.server_url);
        let Ok(prm) = discover_prm(&self.http, &canonical_server_url, None, &self.protocol_version).await else {
            return Some(tokens);
        };
        let Some(as_url) = prm.authorization_servers.as_ref().and_then(|servers| servers.first()) else {
            return Some(tokens);
        };
        let Ok(as_url) = Url::parse(as_url) else { return Some(tokens) };
        let Ok(as_metadata) = discover_as_metadata(&self.http, &as_url, &self.protocol_version).await else {
            return Some(tokens);
        };
        let Some(client_info) = self.storage.load_client_info().await else { return Some(tokens) };
        let resource = resource::select_resource(Url::parse(&prm.resource).ok().as_ref(), &canonical_server_url);
        let auth_method = client_auth::select(as_metadata.token_endpoint_auth_methods_supported.as_deref(), self.client_auth_preference, client_info.client_secret.is_some());

        match refresh::refresh(
            &self.http,
            &as_metadata.token_endpoint,
            &refresh_token,
            Some(&resource),
            Some((auth_method, &client_info.client_id, client_info.client_secret.as_deref())),
            None,
        )
        .await
        {
            Ok(fresh) => {
                self.storage.store_tokens(&fresh).await;
                Some(fresh)
            }
            Err(_) => Some(tokens),
        }
    }

    async fn handle_unauthorized(&self, ctx: &UnauthorizedContext) -> Result<TokenSet, Error> {
        let canonical_server_url = resource::canonicalize(&self.server_url);
        let prm = discover_prm(&self.http, &canonical_server_url, ctx.challenge.as_ref(), &self.protocol_version).await?;
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

        if !pkce::server_supports_s256(as_metadata.code_challenge_methods_supported.as_deref()) {
            return Err(Error::new(ErrorKind::PkceNotSupported, "authorization server does not advertise S256 PKCE support"));
        }

        let client_info = self.client_info(&as_metadata).await?;
        let resource = resource::select_resource(Some(&prm_resource), &canonical_server_url);
        let pkce = Pkce::generate();
        let state = pkce::generate_state();
        let scope = ctx
            .scope
            .clone()
            .or_else(|| prm.scopes_supported.as_ref().map(|scopes| scopes.join(" ")))
            .or_else(|| as_metadata.scopes_supported.as_ref().map(|scopes| scopes.join(" ")))
            .or_else(|| self.scope.clone());

        let mut authorization_url = Url::parse(&as_metadata.authorization_endpoint)
            .map_err(|e| Error::new(ErrorKind::AuthorizationFailed, format!("invalid authorization_endpoint: {e}")))?;
        {
            let mut query = authorization_url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", &client_info.client_id);
            query.append_pair("redirect_uri", &self.redirect_uri);
            query.append_pair("code_challenge", &pkce.challenge);
            query.append_pair("code_challenge_method", pkce::CODE_CHALLENGE_METHOD);
            query.append_pair("state", &state);
            query.append_pair("resource", resource.as_str());
            if let Some(scope) = &scope {
                query.append_pair("scope", scope);
            }
        }

        let redirect = self.redirect_handler.redirect(authorization_url).await?;
        if !pkce::constant_time_eq(&redirect.state, &state) {
            return Err(Error::new(ErrorKind::InvalidState, "authorization response state did not match the request"));
        }

        let auth_method =
            client_auth::select(as_metadata.token_endpoint_auth_methods_supported.as_deref(), self.client_auth_preference, client_info.client_secret.is_some());

        let exchange = |client_id: String, client_secret: Option<String>| {
            let code = redirect.code.clone();
            let verifier = pkce.verifier.clone();
            let resource = resource.clone();
            let token_endpoint = as_metadata.token_endpoint.clone();
            async move {
                let resource_str = resource.to_string();
                let mut form = vec![
                    ("grant_type".to_string(), "authorization_code".to_string()),
                    ("code".to_string(), code),
                    ("redirect_uri".to_string(), self.redirect_uri.clone()),
                    ("code_verifier".to_string(), verifier),
                    ("resource".to_string(), resource_str),
                ];
                let credentials = client_auth::apply(auth_method, &client_id, client_secret.as_deref());
                form.extend(credentials.body_params);
                let body = encode_form(form.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                let mut request = self.http.post(&token_endpoint).header("Content-Type", "application/x-www-form-urlencoded");
                if let Some(header) = &credentials.authorization_header {
                    request = request.header("Authorization", header);
                }
                let response = request.body(body).send().await.map_err(|e| Error::new(ErrorKind::AuthorizationFailed, format!("token request failed: {e}")))?;
                let status = response.status();
                if status.is_success() {
                    let tokens: TokenSet = response.json().await.map_err(|e| Error::new(ErrorKind::AuthorizationFailed, format!("invalid token response: {e}")))?;
                    Ok(tokens.normalized()?)
                } else {
                    let body: serde_json::Value = response.json().await.unwrap_or_default();
                    let error = body.get("error").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    Err(Error::new(ErrorKind::AuthorizationFailed, format!("token exchange failed with status {status}: {error}")))
                }
            }
        };

        let result = exchange(client_info.client_id.clone(), client_info.client_secret.clone()).await;
        let tokens = match result {
            Ok(tokens) => tokens,
            Err(error) if error.message.contains("invalid_client") => {
                self.storage.clear_client_info().await;
                let fresh_client = self.register(&as_metadata).await?;
                self.storage.store_client_info(&fresh_client).await;
                exchange(fresh_client.client_id, fresh_client.client_secret).await?
            }
            Err(error) => return Err(error),
        };

        self.storage.store_tokens(&tokens).await;
        Ok(tokens)
    }
}
