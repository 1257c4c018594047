//! Dynamic Client Registration (RFC 7591).

use mcp_core::{Error, ErrorKind};
use serde::{Deserialize, Serialize};

use crate::discovery::AsMetadata;

/// Metadata this client registers with the authorization server.
#[derive(Debug, Clone, Serialize)]
pub struct ClientMetadata {
    pub redirect_uris: Vec<String>,
    pub client_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
}

/// The registered client information returned by a successful DCR call,
/// or recovered from the CIMD path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Register `metadata` with the authorization server's registration
/// endpoint. Both `200` and `201` are accepted as success.
pub async fn register(client: &reqwest::Client, as_metadata: &AsMetadata, metadata: &ClientMetadata) -> Result<ClientInfo, Error> {
    let endpoint = as_metadata
        .registration_endpoint
        .as_deref()
        .ok_or_else(|| Error::new(ErrorKind::RegistrationFailed, "authorization server has no registration_endpoint"))?;

    let response = client
        .post(endpoint)
        .json(metadata)
        .send()
        .await
        .map_err(|e| Error::new(ErrorKind::RegistrationFailed, format!("registration request failed: {e}")))?;

    let status = response.status();
    if status.as_u16() == 200 || status.as_u16() == 201 {
        response.json::<ClientInfo>().await.map_err(|e| Error::new(ErrorKind::RegistrationFailed, format!("invalid registration response: {e}")))
    } else {
        let body = response.json::<OAuthErrorResponse>().await.ok();
        let message = body.map_or_else(
            || format!("registration failed with status {status}"),
            |b| format!("registration failed: {} ({})", b.error, b.error_description.unwrap_or_default()),
        );
        Err(Error::new(ErrorKind::RegistrationFailed, message))
    }
}
