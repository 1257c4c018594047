use mcp_core::RequestId;
use serde_json::Value;

/// The literal `"jsonrpc"` value every message on the wire carries.
pub const JSONRPC_VERSION: &str = "2.0";

/// A decoded JSON-RPC 2.0 message: a request, a notification, or a
/// response (success or error).
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A request expecting a reply.
    Request(Request),
    /// A one-way notification; no reply is expected.
    Notification(Notification),
    /// A reply to a previously-sent request.
    Response(Response),
}

/// `{id, method, params?}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// The request id. Never null on the wire — a literal JSON `null` id is
    /// rejected at decode time.
    pub id: RequestId,
    /// The method name.
    pub method: String,
    /// Method parameters, if any.
    pub params: Option<Value>,
}

/// `{method, params?}` — no id, no reply expected.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// The method name.
    pub method: String,
    /// Method parameters, if any.
    pub params: Option<Value>,
}

/// `{id?, result}` or `{id?, error}`.
///
/// `id` is `None` only for the error responses the JSON-RPC spec allows to
/// omit or null out the id (e.g. a top-level parse error where no id could
/// be recovered).
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The request id this is a reply to, or `None` if none could be
    /// determined.
    pub id: Option<RequestId>,
    /// The success result or the error payload.
    pub payload: ResponsePayload,
}

/// The two shapes a [`Response`] can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// `{"result": ...}`
    Success(Value),
    /// `{"error": {"code", "message", "data"?}}`
    Error(JsonRpcError),
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcError {
    /// The numeric error code.
    pub code: i64,
    /// A short, human-readable message.
    pub message: String,
    /// Optional structured error data.
    pub data: Option<Value>,
}

impl Request {
    /// Build a request with no parameters.
    pub fn without_params(method: impl Into<String>, id: impl Into<RequestId>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }
}

impl Response {
    /// Build a success response.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            payload: ResponsePayload::Success(result),
        }
    }

    /// Build an error response with an id.
    pub fn error(id: Option<RequestId>, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            payload: ResponsePayload::Error(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}
