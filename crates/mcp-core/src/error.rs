use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type alias used throughout the MCP session engine.
pub type Result<T> = std::result::Result<T, Error>;

/// A single error type shared by the wire codec, the session engine, the
/// transports, and the OAuth subsystems.
///
/// `kind` carries the taxonomy (see [`ErrorKind`]); `message` is a short,
/// human-readable description suitable for logs. Provider-supplied messages
/// (resource/prompt handler failures) are sanitized by the server before
/// `message` ever reaches a remote peer — see the session engine's
/// `sanitize` module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Additional structured context, populated only where the kind needs it
    /// (e.g. `resource_mismatch`'s expected/actual pair).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    /// Component that raised the error, for logging only — never sent over
    /// the wire.
    #[serde(skip)]
    pub component: Option<&'static str>,
}

/// Extra structured fields a particular [`ErrorKind`] may need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Used by `resource_mismatch`: the resource the caller expected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Used by `resource_mismatch`: the resource actually returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    /// Used by JSON-RPC errors carrying a numeric code not in our taxonomy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

/// Error taxonomy. Mirrors §7 of the session engine design: transport,
/// parse, JSON-RPC, OAuth-protocol, OAuth-pipeline, and capability errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // --- Transport ---
    /// Connect/read/write/timeout failure at the transport layer.
    Transport,
    /// Operation exceeded its caller-supplied deadline.
    Timeout,

    // --- Parse ---
    /// Bytes received were not valid JSON, or not a valid JSON-RPC envelope.
    Parse,

    // --- JSON-RPC (numeric codes per the 2.0 spec) ---
    /// `-32700`: invalid JSON was received.
    JsonRpcParseError,
    /// `-32600`: the JSON sent is not a valid request object.
    InvalidRequest,
    /// `-32601`: the method does not exist or is not available.
    MethodNotFound,
    /// `-32602`: invalid method parameters.
    InvalidParams,
    /// `-32603`: internal JSON-RPC error.
    InternalError,
    /// Implementation-defined: a referenced resource does not exist.
    ResourceNotFound,

    // --- OAuth protocol (RFC 6749 §5.2, 6750, 7591, 8707) ---
    /// A recognized OAuth error code, preserved verbatim in `message`.
    OAuthProtocol,
    /// An OAuth error code we don't recognize; the literal string is kept.
    OAuthUnrecognized,

    // --- OAuth pipeline ---
    /// PRM or AS metadata discovery failed.
    DiscoveryFailed,
    /// The authorization server does not support PKCE S256.
    PkceNotSupported,
    /// The `state` parameter returned by the authorization server did not
    /// match the one we sent.
    InvalidState,
    /// Dynamic client registration failed.
    RegistrationFailed,
    /// The authorization step of an OAuth flow failed.
    AuthorizationFailed,
    /// A token refresh attempt failed.
    TokenRefreshFailed,
    /// PRM's resource is not a hierarchical parent of the canonical server
    /// URL. Carries `expected`/`actual` in [`ErrorContext`].
    ResourceMismatch,

    // --- Capability / handshake ---
    /// A notification or request would use a capability that was never
    /// advertised; generated locally before transmission.
    CapabilityNotAdvertised,
    /// The server negotiated a protocol version the client never listed as
    /// supported.
    ProtocolVersionMismatch,

    // --- General ---
    /// Request was cancelled via `notifications/cancelled`.
    Cancelled,
    /// Catch-all for errors that don't fit elsewhere.
    Internal,

    // --- HTTP transport session management ---
    /// The HTTP session manager is at `max_sessions` capacity.
    TooManySessions,
    /// `Mcp-Session-Id` referred to a session the manager doesn't know about.
    UnknownSession,
}

impl Error {
    /// Construct a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
            component: None,
        }
    }

    /// Attach the component name that raised this error (logging only).
    #[must_use]
    pub fn with_component(mut self, component: &'static str) -> Self {
        self.component = Some(component);
        self
    }

    /// Build a `resource_mismatch` error carrying expected/actual URLs.
    pub fn resource_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        let expected = expected.into();
        let actual = actual.into();
        Self {
            kind: ErrorKind::ResourceMismatch,
            message: format!("resource mismatch: expected {expected}, got {actual}"),
            context: Some(ErrorContext {
                expected: Some(expected),
                actual: Some(actual),
                code: None,
            }),
            component: None,
        }
    }

    /// Construct a JSON-RPC error carrying an arbitrary numeric code not
    /// covered by [`ErrorKind`]'s named variants.
    pub fn json_rpc_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InternalError,
            message: message.into(),
            context: Some(ErrorContext {
                expected: None,
                actual: None,
                code: Some(code),
            }),
            component: None,
        }
    }

    /// The numeric JSON-RPC error code this error maps to, per §7.
    #[must_use]
    pub fn json_rpc_code_value(&self) -> i64 {
        if let Some(ctx) = &self.context
            && let Some(code) = ctx.code
        {
            return code;
        }
        match self.kind {
            ErrorKind::JsonRpcParseError | ErrorKind::Parse => -32700,
            ErrorKind::InvalidRequest | ErrorKind::UnknownSession => -32600,
            ErrorKind::MethodNotFound => -32601,
            ErrorKind::InvalidParams => -32602,
            ErrorKind::ResourceNotFound => -32001,
            _ => -32603,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_rpc_codes_match_spec_table() {
        assert_eq!(
            Error::new(ErrorKind::InvalidRequest, "x").json_rpc_code_value(),
            -32600
        );
        assert_eq!(
            Error::new(ErrorKind::MethodNotFound, "x").json_rpc_code_value(),
            -32601
        );
        assert_eq!(
            Error::new(ErrorKind::InvalidParams, "x").json_rpc_code_value(),
            -32602
        );
        assert_eq!(
            Error::new(ErrorKind::InternalError, "x").json_rpc_code_value(),
            -32603
        );
    }

    #[test]
    fn resource_mismatch_carries_context() {
        let err = Error::resource_mismatch("https://a/mcp", "https://b/mcp");
        assert_eq!(err.kind, ErrorKind::ResourceMismatch);
        let ctx = err.context.unwrap();
        assert_eq!(ctx.expected.as_deref(), Some("https://a/mcp"));
        assert_eq!(ctx.actual.as_deref(), Some("https://b/mcp"));
    }
}
