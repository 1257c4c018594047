//! Server-side error sanitization.
//!
//! A handler failure can carry details (a panic message, a dependency's
//! error string, a file path) that should never reach the remote peer.
//! Before any [`mcp_core::Error`] becomes a JSON-RPC error response, it
//! passes through [`sanitize_for_wire`], which keeps protocol-level errors
//! verbatim (they're meaningful to the caller) and replaces anything else
//! with a generic message keyed only by its taxonomy.

use mcp_core::{Error, ErrorKind};

/// Render `error` as the `(code, message)` pair that is safe to put on the
/// wire, collapsing anything that isn't an explicit protocol-level error
/// into a generic message for its [`ErrorKind`].
#[must_use]
pub fn sanitize_for_wire(error: &Error) -> (i64, String) {
    let code = error.json_rpc_code_value();
    let message = match error.kind {
        ErrorKind::InvalidRequest
        | ErrorKind::MethodNotFound
        | ErrorKind::InvalidParams
        | ErrorKind::JsonRpcParseError
        | ErrorKind::ResourceNotFound
        | ErrorKind::Cancelled
        | ErrorKind::CapabilityNotAdvertised => error.message.clone(),
        _ => generic_message(error.kind),
    };
    (code, message)
}

fn generic_message(kind: ErrorKind) -> String {
    match kind {
        ErrorKind::Transport => "a transport error occurred".to_string(),
        ErrorKind::Timeout => "the operation timed out".to_string(),
        ErrorKind::Parse => "the request could not be parsed".to_string(),
        ErrorKind::AuthorizationFailed => "authorization failed".to_string(),
        ErrorKind::ProtocolVersionMismatch => "protocol version mismatch".to_string(),
        _ => "internal error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_keep_their_message() {
        let error = Error::new(ErrorKind::MethodNotFound, "method 'frobnicate' not found");
        let (code, message) = sanitize_for_wire(&error);
        assert_eq!(code, -32601);
        assert_eq!(message, "method 'frobnicate' not found");
    }

    #[test]
    fn internal_errors_are_genericized() {
        let error = Error::new(ErrorKind::Internal, "panicked at src/handlers/tools.rs:42: unwrap on None");
        let (code, message) = sanitize_for_wire(&error);
        assert_eq!(code, -32603);
        assert_eq!(message, "internal error");
    }

    #[test]
    fn transport_errors_are_genericized() {
        let error = Error::new(ErrorKind::Transport, "connection reset by 10.0.0.5:5432");
        let (_, message) = sanitize_for_wire(&error);
        assert_eq!(message, "a transport error occurred");
    }
}
