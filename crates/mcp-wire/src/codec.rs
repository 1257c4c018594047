use mcp_core::{Error, ErrorKind, RequestId};
use serde_json::{Map, Value, json};

use crate::message::{JSONRPC_VERSION, JsonRpcError, Message, Notification, Request, Response, ResponsePayload};

/// Encode a [`Message`] to its JSON-RPC byte representation.
///
/// Absent optionals are omitted entirely; `null` is never written except
/// for a response whose id could not be determined, where the JSON-RPC
/// spec requires a literal `"id": null`.
pub fn encode(message: &Message) -> Vec<u8> {
    let value = to_value(message);
    serde_json::to_vec(&value).expect("JSON-RPC messages always serialize")
}

fn to_value(message: &Message) -> Value {
    let mut map = Map::new();
    map.insert("jsonrpc".to_string(), Value::String(JSONRPC_VERSION.to_string()));
    match message {
        Message::Request(Request { id, method, params }) => {
            map.insert("method".to_string(), Value::String(method.clone()));
            if let Some(params) = params {
                map.insert("params".to_string(), params.clone());
            }
            map.insert("id".to_string(), request_id_to_value(id));
        }
        Message::Notification(Notification { method, params }) => {
            map.insert("method".to_string(), Value::String(method.clone()));
            if let Some(params) = params {
                map.insert("params".to_string(), params.clone());
            }
        }
        Message::Response(Response { id, payload }) => {
            match payload {
                ResponsePayload::Success(result) => {
                    map.insert("result".to_string(), result.clone());
                }
                ResponsePayload::Error(err) => {
                    map.insert("error".to_string(), error_to_value(err));
                }
            }
            map.insert(
                "id".to_string(),
                id.as_ref().map(request_id_to_value).unwrap_or(Value::Null),
            );
        }
    }
    Value::Object(map)
}

fn request_id_to_value(id: &RequestId) -> Value {
    match id {
        RequestId::String(s) => Value::String(s.clone()),
        RequestId::Number(n) => json!(n),
    }
}

fn error_to_value(err: &JsonRpcError) -> Value {
    let mut map = Map::new();
    map.insert("code".to_string(), json!(err.code));
    map.insert("message".to_string(), Value::String(err.message.clone()));
    if let Some(data) = &err.data {
        map.insert("data".to_string(), data.clone());
    }
    Value::Object(map)
}

fn value_to_request_id(value: &Value) -> Option<RequestId> {
    match value {
        Value::String(s) => Some(RequestId::String(s.clone())),
        Value::Number(n) => n.as_i64().map(RequestId::Number),
        _ => None,
    }
}

/// Decode a byte payload into a [`Message`].
///
/// # Errors
/// Returns [`ErrorKind::Parse`] if the bytes are not valid JSON, and
/// [`ErrorKind::InvalidRequest`] if they parse as JSON but are not a
/// well-formed JSON-RPC envelope (including the case of an explicit
/// `"id": null` on what looks like a request).
pub fn decode(bytes: &[u8]) -> Result<Message, Error> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::new(ErrorKind::Parse, format!("invalid JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(Error::new(ErrorKind::InvalidRequest, "envelope is not a JSON object"));
    };

    if let Some(method) = map.get("method") {
        let Value::String(method) = method else {
            return Err(Error::new(ErrorKind::InvalidRequest, "method must be a string"));
        };
        let params = map.get("params").cloned();
        return match map.get("id") {
            None => Ok(Message::Notification(Notification {
                method: method.clone(),
                params,
            })),
            Some(Value::Null) => Err(Error::new(
                ErrorKind::InvalidRequest,
                "request id must not be explicit null",
            )),
            Some(id_value) => {
                let id = value_to_request_id(id_value)
                    .ok_or_else(|| Error::new(ErrorKind::InvalidRequest, "id must be a string or number"))?;
                Ok(Message::Request(Request {
                    id,
                    method: method.clone(),
                    params,
                }))
            }
        };
    }

    if let Some(result) = map.get("result") {
        let id = map.get("id").and_then(value_to_request_id);
        return Ok(Message::Response(Response {
            id,
            payload: ResponsePayload::Success(result.clone()),
        }));
    }

    if let Some(error) = map.get("error") {
        let Value::Object(error_map) = error else {
            return Err(Error::new(ErrorKind::InvalidRequest, "error must be an object"));
        };
        let code = error_map
            .get("code")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::new(ErrorKind::InvalidRequest, "error.code must be an integer"))?;
        let message = error_map
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::new(ErrorKind::InvalidRequest, "error.message must be a string"))?
            .to_string();
        let data = error_map.get("data").cloned();
        let id = map.get("id").and_then(value_to_request_id);
        return Ok(Message::Response(Response {
            id,
            payload: ResponsePayload::Error(JsonRpcError { code, message, data }),
        }));
    }

    Err(Error::new(
        ErrorKind::InvalidRequest,
        "envelope has neither method, result, nor error",
    ))
}

/// Best-effort recovery of a top-level `"id"` field from a payload that may
/// not be a well-formed JSON-RPC message.
///
/// Unlike [`decode`], this only requires the bytes to be *valid JSON*; it
/// does not require the object to look like a JSON-RPC request or
/// response. This is what lets the session engine fail exactly one pending
/// request when a malformed reply still carries a recognizable id.
pub fn extract_id(bytes: &[u8]) -> Option<RequestId> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    let map = value.as_object()?;
    value_to_request_id(map.get("id")?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_request_without_params() {
        let msg = Message::Request(Request::without_params("ping", 1i64));
        let bytes = encode(&msg);
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("params"));
        assert!(text.contains("\"jsonrpc\":\"2.0\""));
    }

    #[test]
    fn round_trips_notification() {
        let msg = Message::Notification(Notification {
            method: "notifications/initialized".into(),
            params: None,
        });
        let bytes = encode(&msg);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn rejects_explicit_null_request_id() {
        let bytes = br#"{"jsonrpc":"2.0","method":"ping","id":null}"#;
        assert!(decode(bytes).is_err());
    }

    #[test]
    fn response_tolerates_absent_id() {
        let bytes = br#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"parse error"}}"#;
        let decoded = decode(bytes).unwrap();
        match decoded {
            Message::Response(Response { id, .. }) => assert_eq!(id, None),
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn extract_id_survives_malformed_envelope() {
        // Not a valid JSON-RPC message (no method/result/error) but valid JSON
        // with a top-level id — extract_id must still find it.
        let bytes = br#"{"id":42,"garbage":true}"#;
        assert_eq!(extract_id(bytes), Some(RequestId::Number(42)));
    }

    #[test]
    fn extract_id_none_on_invalid_json() {
        assert_eq!(extract_id(b"not json at all {"), None);
    }

    #[test]
    fn extract_id_none_when_absent() {
        let bytes = br#"{"foo":"bar"}"#;
        assert_eq!(extract_id(bytes), None);
    }
}
