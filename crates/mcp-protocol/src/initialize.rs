use serde::{Deserialize, Serialize};

use crate::capabilities::{ClientCapabilities, ServerCapabilities};
use crate::version::ProtocolVersion;

/// Name and version of either side of a session, as reported in the
/// handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

impl Default for Implementation {
    /// The documented default for a handshake that omits `clientInfo` or
    /// `serverInfo` entirely.
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            version: "0.0.0".to_string(),
        }
    }
}

/// The `initialize` request params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    /// Absent decodes to [`ProtocolVersion::default`] (the documented
    /// latest-version default), not a deserialization error.
    #[serde(default)]
    pub protocol_version: ProtocolVersion,
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    #[serde(default, rename = "clientInfo")]
    pub client_info: Implementation,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// The `initialize` response result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: ProtocolVersion,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// The `notifications/initialized` notification. Carries no payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedNotification {}

impl InitializeResult {
    /// Validate the handshake result the client received from a server, per
    /// the negotiation contract: the returned version must be one the
    /// client itself supports, or the handshake must fail.
    pub fn validate_against(
        &self,
        client_supported: &crate::version::SupportedVersions,
    ) -> Result<(), mcp_core::Error> {
        if client_supported.supports(&self.protocol_version) {
            Ok(())
        } else {
            Err(mcp_core::Error::new(
                mcp_core::ErrorKind::ProtocolVersionMismatch,
                format!(
                    "server negotiated unsupported protocol version {}",
                    self.protocol_version
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_decode_to_documented_defaults() {
        let request: InitializeRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(request.protocol_version, ProtocolVersion::default());
        assert_eq!(request.client_info, Implementation::default());
        assert_eq!(request.client_info.name, "unknown");
        assert_eq!(request.client_info.version, "0.0.0");
    }

    #[test]
    fn explicit_fields_round_trip() {
        let request = InitializeRequest {
            protocol_version: ProtocolVersion::new("2025-03-26"),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "acme-client".into(),
                version: "1.2.3".into(),
            },
            meta: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["protocolVersion"], "2025-03-26");
        assert_eq!(value["clientInfo"]["name"], "acme-client");
        let round_tripped: InitializeRequest = serde_json::from_value(value).unwrap();
        assert_eq!(round_tripped, request);
    }
}
