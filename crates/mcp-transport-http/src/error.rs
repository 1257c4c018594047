//! HTTP-status mapping and JSON-RPC error-body shaping for `mcp_core::Error`
//! as it surfaces from the session manager and the two transport ends.

use mcp_core::{Error, ErrorKind};
use serde_json::{Value, json};

/// `invalid_request` JSON-RPC error code.
pub const INVALID_REQUEST: i64 = -32600;
/// `internal_error` JSON-RPC error code.
pub const INTERNAL_ERROR: i64 = -32603;

/// The HTTP status `error` maps to.
#[must_use]
pub fn status_code(error: &Error) -> u16 {
    match error.kind {
        ErrorKind::TooManySessions => 503,
        ErrorKind::UnknownSession => 404,
        ErrorKind::InvalidRequest => 400,
        _ => 500,
    }
}

/// Builds the exact JSON-RPC error envelope every HTTP transport error
/// response carries: `{"jsonrpc":"2.0","id":null,"error":{"code":...,"message":...}}`.
#[must_use]
pub fn json_rpc_error_body(code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": Value::Null,
        "error": {
            "code": code,
            "message": message,
        }
    })
}

/// Render `error` as the standard JSON-RPC error body.
#[must_use]
pub fn to_body(error: &Error) -> Value {
    json_rpc_error_body(error.json_rpc_code_value(), &error.message)
}

/// Build a `too_many_sessions` error.
#[must_use]
pub fn too_many_sessions() -> Error {
    Error::new(ErrorKind::TooManySessions, "too many concurrent sessions")
}

/// Build a `missing Mcp-Session-Id header` error.
#[must_use]
pub fn missing_session_id() -> Error {
    Error::new(ErrorKind::InvalidRequest, "missing Mcp-Session-Id header")
}

/// Build an `unknown session id` error.
#[must_use]
pub fn unknown_session(session_id: &str) -> Error {
    Error::new(ErrorKind::UnknownSession, format!("unknown session id: {session_id}"))
}

/// Build an `invalid request body` error.
#[must_use]
pub fn invalid_body(detail: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::InvalidRequest, format!("invalid request body: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_sessions_maps_to_503_internal_error() {
        let err = too_many_sessions();
        assert_eq!(status_code(&err), 503);
        assert_eq!(err.json_rpc_code_value(), INTERNAL_ERROR);
    }

    #[test]
    fn missing_session_id_maps_to_400_invalid_request() {
        let err = missing_session_id();
        assert_eq!(status_code(&err), 400);
        assert_eq!(err.json_rpc_code_value(), INVALID_REQUEST);
    }

    #[test]
    fn unknown_session_maps_to_404_invalid_request() {
        let err = unknown_session("abc");
        assert_eq!(status_code(&err), 404);
        assert_eq!(err.json_rpc_code_value(), INVALID_REQUEST);
    }

    #[test]
    fn error_body_has_documented_shape() {
        let body = json_rpc_error_body(INVALID_REQUEST, "missing session id");
        assert_eq!(body["jsonrpc"], "2.0");
        assert!(body["id"].is_null());
        assert_eq!(body["error"]["code"], INVALID_REQUEST);
        assert_eq!(body["error"]["message"], "missing session id");
    }
}
