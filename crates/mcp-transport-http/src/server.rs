//! Server-side streamable HTTP transport: an axum router bridging HTTP
//! requests to per-session [`Transport`] instances.
//!
//! A `POST` to the configured endpoint delivers a JSON-RPC payload into the
//! addressed session's inbound queue and replies `202 Accepted`; the actual
//! JSON-RPC reply (and any server-initiated notification) is delivered
//! asynchronously over the session's `GET` SSE stream. `DELETE` terminates a
//! session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Bytes as AxumBytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event as AxumSseEvent, KeepAlive, Sse},
    },
    routing::get,
};
use bytes::Bytes;
use futures::{StreamExt, stream};
use mcp_transport_traits::{
    AtomicMetrics, Transport, TransportCapabilities, TransportConfig, TransportError,
    TransportEventEmitter, TransportMessage, TransportMetrics, TransportResult, TransportState,
    TransportType,
};
use serde_json::Value;
use tokio::sync::{Mutex as TokioMutex, mpsc};

use crate::config::HttpTransportConfig;
use crate::error::{json_rpc_error_body, missing_session_id, status_code, unknown_session};
use crate::session::HttpSessionManager;

/// The server-side end of one HTTP session's transport, handed to the
/// embedding session engine when a client's `initialize` request creates a
/// new session.
pub struct HttpServerTransport {
    session_id: String,
    manager: Arc<HttpSessionManager>,
    inbound_rx: TokioMutex<mpsc::Receiver<Bytes>>,
    state: Arc<StdMutex<TransportState>>,
    capabilities: TransportCapabilities,
    metrics: Arc<AtomicMetrics>,
    event_emitter: TransportEventEmitter,
    next_event_id: AtomicU64,
}

impl std::fmt::Debug for HttpServerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServerTransport")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl HttpServerTransport {
    fn new(session_id: String, manager: Arc<HttpSessionManager>, inbound_rx: mpsc::Receiver<Bytes>) -> Self {
        let (event_emitter, _) = TransportEventEmitter::new();
        Self {
            session_id,
            manager,
            inbound_rx: TokioMutex::new(inbound_rx),
            state: Arc::new(StdMutex::new(TransportState::Connected)),
            capabilities: TransportCapabilities {
                supports_streaming: true,
                supports_bidirectional: true,
                ..TransportCapabilities::default()
            },
            metrics: Arc::new(AtomicMetrics::default()),
            event_emitter,
            next_event_id: AtomicU64::new(0),
        }
    }

    /// The `Mcp-Session-Id` this transport was created for.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl Transport for HttpServerTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Http
    }

    fn capabilities(&self) -> &TransportCapabilities {
        &self.capabilities
    }

    async fn state(&self) -> TransportState {
        self.state.lock().expect("state mutex poisoned").clone()
    }

    async fn connect(&self) -> TransportResult<()> {
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.manager.remove(&self.session_id);
        *self.state.lock().expect("state mutex poisoned") = TransportState::Disconnected;
        self.event_emitter.emit_disconnected(
            TransportType::Http,
            format!("http+sse://session/{}", self.session_id),
            None,
        );
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        let event_id = self.next_event_id.fetch_add(1, Ordering::Relaxed).to_string();
        let size = message.size();
        self.manager
            .broadcast(&self.session_id, event_id, message.payload)
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.metrics.bytes_sent.fetch_add(size as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
        let mut rx = self.inbound_rx.lock().await;
        match rx.recv().await {
            Some(payload) => {
                let id = mcp_wire::extract_id(&payload).unwrap_or_else(|| {
                    mcp_core::RequestId::from(uuid::Uuid::new_v4().to_string())
                });
                self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                self.metrics
                    .bytes_received
                    .fetch_add(payload.len() as u64, Ordering::Relaxed);
                Ok(Some(TransportMessage::new(id, payload)))
            }
            None => Ok(None),
        }
    }

    async fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    fn endpoint(&self) -> Option<String> {
        Some(format!("http+sse://session/{}", self.session_id))
    }

    async fn configure(&self, _config: TransportConfig) -> TransportResult<()> {
        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    manager: Arc<HttpSessionManager>,
    config: HttpTransportConfig,
    new_session_tx: mpsc::UnboundedSender<HttpServerTransport>,
}

/// Build the axum router for the streamable HTTP transport.
///
/// Returns the router alongside a channel that yields a new
/// [`HttpServerTransport`] each time a client's `initialize` request creates
/// a session; the embedding application should drain it and hand each
/// transport to a new session-engine session.
#[must_use]
pub fn router(config: HttpTransportConfig) -> (Router, mpsc::UnboundedReceiver<HttpServerTransport>) {
    let manager = Arc::new(HttpSessionManager::new(config.max_sessions, config.replay_buffer_size));
    let (new_session_tx, new_session_rx) = mpsc::unbounded_channel();
    let path = config.endpoint_path.clone();
    let state = AppState {
        manager,
        config,
        new_session_tx,
    };

    let router = Router::new()
        .route(&path, get(get_handler).post(post_handler).delete(delete_handler))
        .with_state(state);

    (router, new_session_rx)
}

fn error_response(status: u16, code: i64, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = HeaderMap::new();
    if status == StatusCode::SERVICE_UNAVAILABLE {
        headers.insert(header::RETRY_AFTER, HeaderValue::from_static("60"));
    }
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    (status, headers, Json(json_rpc_error_body(code, message))).into_response()
}

fn session_header(session_id: &str) -> HeaderValue {
    HeaderValue::from_str(session_id).unwrap_or_else(|_| HeaderValue::from_static("invalid"))
}

async fn get_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = headers.get("Mcp-Session-Id").and_then(|v| v.to_str().ok()) else {
        return error_response(400, crate::error::INVALID_REQUEST, "missing Mcp-Session-Id header");
    };

    let last_event_id = headers.get("Last-Event-ID").and_then(|v| v.to_str().ok());

    let (replay, mut live) = match state.manager.subscribe(session_id, last_event_id) {
        Ok(pair) => pair,
        Err(e) => return error_response(status_code(&e), e.json_rpc_code_value(), &e.message),
    };

    let keepalive = state.config.keepalive_interval;
    let replay_stream = stream::iter(replay);
    let live_stream = stream::unfold(live, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    });
    let events = replay_stream.chain(live_stream).map(|event| {
        Ok::<AxumSseEvent, std::convert::Infallible>(
            AxumSseEvent::default()
                .id(event.id)
                .data(String::from_utf8_lossy(&event.payload).into_owned()),
        )
    });

    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(keepalive))
        .into_response()
}

async fn post_handler(State(state): State<AppState>, headers: HeaderMap, body: AxumBytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return error_response(400, crate::error::INVALID_REQUEST, &format!("invalid JSON: {e}"));
        }
    };

    let is_initialize = payload.get("method").and_then(Value::as_str) == Some("initialize");
    let session_id = headers.get("Mcp-Session-Id").and_then(|v| v.to_str().ok());

    let session_id = if is_initialize && session_id.is_none() {
        let (id, inbound_rx) = match state.manager.create_session() {
            Ok(pair) => pair,
            Err(e) => return error_response(status_code(&e), e.json_rpc_code_value(), &e.message),
        };
        let transport = HttpServerTransport::new(id.clone(), state.manager.clone(), inbound_rx);
        let _ = state.new_session_tx.send(transport);
        id
    } else {
        match session_id {
            Some(id) if state.manager.contains(id) => id.to_string(),
            Some(id) => {
                let err = unknown_session(id);
                return error_response(status_code(&err), err.json_rpc_code_value(), &err.message);
            }
            None => {
                let err = missing_session_id();
                return error_response(status_code(&err), err.json_rpc_code_value(), &err.message);
            }
        }
    };

    if let Err(e) = state.manager.deliver_inbound(&session_id, Bytes::from(body.to_vec())).await {
        return error_response(status_code(&e), e.json_rpc_code_value(), &e.message);
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert("Mcp-Session-Id", session_header(&session_id));
    response_headers.insert(
        "Mcp-Protocol-Version",
        HeaderValue::from_str(&state.config.protocol_version)
            .unwrap_or_else(|_| HeaderValue::from_static("unknown")),
    );

    (StatusCode::ACCEPTED, response_headers, Json(serde_json::json!({}))).into_response()
}

async fn delete_handler(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    match headers.get("Mcp-Session-Id").and_then(|v| v.to_str().ok()) {
        Some(id) if state.manager.remove(id) => StatusCode::OK,
        Some(_) => StatusCode::NOT_FOUND,
        None => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_config() -> HttpTransportConfig {
        HttpTransportConfig::new().with_max_sessions(2)
    }

    #[tokio::test]
    async fn initialize_without_session_id_creates_one() {
        let (router, mut new_sessions) = router(test_config());

        let response = router
            .oneshot(
                Request::post("/mcp")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(response.headers().contains_key("Mcp-Session-Id"));
        assert!(new_sessions.try_recv().is_ok());
    }

    #[tokio::test]
    async fn missing_session_id_on_non_initialize_is_400() {
        let (router, _rx) = router(test_config());

        let response = router
            .oneshot(
                Request::post("/mcp")
                    .body(axum::body::Body::from(r#"{"jsonrpc":"2.0","method":"notifications/ping"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_id_is_404() {
        let (router, _rx) = router(test_config());

        let response = router
            .oneshot(
                Request::post("/mcp")
                    .header("Mcp-Session-Id", "does-not-exist")
                    .body(axum::body::Body::from(r#"{"jsonrpc":"2.0","method":"ping"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn overflow_returns_503_with_retry_after() {
        let (router, _rx) = router(HttpTransportConfig::new().with_max_sessions(0));

        let response = router
            .oneshot(
                Request::post("/mcp")
                    .body(axum::body::Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "60");
    }

    #[tokio::test]
    async fn delete_without_session_id_is_400() {
        let (router, _rx) = router(test_config());
        let response = router
            .oneshot(Request::delete("/mcp").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
