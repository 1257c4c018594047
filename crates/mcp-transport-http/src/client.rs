//! Client-side streamable HTTP transport.
//!
//! Requests are always sent as a `POST` to the configured endpoint. Replies
//! and server-initiated messages arrive either inline in the POST response
//! body (`streaming: false`) or over a standing `GET` SSE stream that
//! reconnects with `Last-Event-ID` on drop (`streaming: true`, the default).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use mcp_transport_traits::{
    AtomicMetrics, Transport, TransportCapabilities, TransportConfig, TransportError,
    TransportEventEmitter, TransportMessage, TransportMetrics, TransportResult, TransportState,
    TransportType,
};
use reqwest::{Client, StatusCode};
use tokio::sync::{Mutex as TokioMutex, mpsc};
use tokio::task::JoinHandle;

use crate::config::HttpTransportConfig;
use crate::sse::SseParser;

/// Supplies (and refreshes) the bearer token attached to outbound requests.
///
/// An OAuth client provider supplies a real implementation; unauthenticated
/// deployments and tests can use [`NoAuth`].
#[async_trait]
pub trait HttpAuthProvider: Send + Sync + std::fmt::Debug {
    /// Returns the current bearer token, if any.
    async fn token(&self) -> Option<String>;

    /// Called on a `401` response. Should refresh credentials and return the
    /// token to retry with.
    async fn on_unauthorized(&self, www_authenticate: Option<&str>) -> TransportResult<String>;

    /// Called on a `403` response carrying `insufficient_scope`. Should step
    /// up the grant and return the token to retry with.
    async fn on_forbidden(&self, www_authenticate: Option<&str>) -> TransportResult<String>;
}

/// An [`HttpAuthProvider`] that never attaches credentials.
#[derive(Debug, Default)]
pub struct NoAuth;

#[async_trait]
impl HttpAuthProvider for NoAuth {
    async fn token(&self) -> Option<String> {
        None
    }

    async fn on_unauthorized(&self, _www_authenticate: Option<&str>) -> TransportResult<String> {
        Err(TransportError::AuthenticationFailed(
            "no auth provider configured".to_string(),
        ))
    }

    async fn on_forbidden(&self, _www_authenticate: Option<&str>) -> TransportResult<String> {
        Err(TransportError::AuthenticationFailed(
            "no auth provider configured".to_string(),
        ))
    }
}

/// Client-side half of the streamable HTTP transport.
pub struct HttpClientTransport {
    http: Client,
    base_url: String,
    config: HttpTransportConfig,
    auth: Arc<dyn HttpAuthProvider>,
    session_id: Arc<StdMutex<Option<String>>>,
    last_event_id: Arc<StdMutex<Option<String>>>,
    inbound_tx: Arc<StdMutex<Option<mpsc::UnboundedSender<TransportMessage>>>>,
    inbound_rx: TokioMutex<mpsc::UnboundedReceiver<TransportMessage>>,
    stream_task: StdMutex<Option<JoinHandle<()>>>,
    stop_flag: Arc<AtomicBool>,
    state: Arc<StdMutex<TransportState>>,
    capabilities: TransportCapabilities,
    metrics: Arc<AtomicMetrics>,
    event_emitter: TransportEventEmitter,
}

impl std::fmt::Debug for HttpClientTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpClientTransport {
    /// Create a client transport against `base_url` (e.g.
    /// `http://localhost:8080/mcp`), using `auth` to attach and refresh
    /// bearer credentials.
    #[must_use]
    pub fn new(base_url: impl Into<String>, config: HttpTransportConfig, auth: Arc<dyn HttpAuthProvider>) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (event_emitter, _) = TransportEventEmitter::new();
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            config,
            auth,
            session_id: Arc::new(StdMutex::new(None)),
            last_event_id: Arc::new(StdMutex::new(None)),
            inbound_tx: Arc::new(StdMutex::new(Some(inbound_tx))),
            inbound_rx: TokioMutex::new(inbound_rx),
            stream_task: StdMutex::new(None),
            stop_flag: Arc::new(AtomicBool::new(false)),
            state: Arc::new(StdMutex::new(TransportState::Disconnected)),
            capabilities: TransportCapabilities {
                supports_streaming: true,
                supports_bidirectional: true,
                ..TransportCapabilities::default()
            },
            metrics: Arc::new(AtomicMetrics::default()),
            event_emitter,
        }
    }

    /// Create a client transport with no authentication.
    #[must_use]
    pub fn unauthenticated(base_url: impl Into<String>, config: HttpTransportConfig) -> Self {
        Self::new(base_url, config, Arc::new(NoAuth))
    }

    fn current_session_id(&self) -> Option<String> {
        self.session_id.lock().expect("session id mutex poisoned").clone()
    }

    fn spawn_event_stream(&self) {
        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let protocol_version = self.config.protocol_version.clone();
        let session_id = self.session_id.clone();
        let last_event_id = self.last_event_id.clone();
        let inbound_tx = self.inbound_tx.clone();
        let stop_flag = self.stop_flag.clone();

        let handle = tokio::spawn(async move {
            while !stop_flag.load(Ordering::Relaxed) {
                let Some(sid) = session_id.lock().expect("session id mutex poisoned").clone() else {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                };

                let mut request = http
                    .get(&base_url)
                    .header("Accept", "text/event-stream")
                    .header("Mcp-Session-Id", &sid)
                    .header("Mcp-Protocol-Version", &protocol_version);
                if let Some(id) = last_event_id.lock().expect("last event id mutex poisoned").clone() {
                    request = request.header("Last-Event-ID", id);
                }

                let Ok(response) = request.send().await else {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    continue;
                };
                if !response.status().is_success() {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    continue;
                }

                let mut parser = SseParser::new();
                let mut byte_stream = response.bytes_stream();
                while let Some(chunk) = byte_stream.next().await {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    let Ok(chunk) = chunk else { break };
                    for event in parser.feed(&chunk) {
                        if let Some(id) = &event.id {
                            *last_event_id.lock().expect("last event id mutex poisoned") = Some(id.clone());
                        }
                        let payload = Bytes::from(event.data.into_bytes());
                        let id = mcp_wire::extract_id(&payload)
                            .unwrap_or_else(|| mcp_core::RequestId::from(uuid::Uuid::new_v4().to_string()));
                        let message = TransportMessage::new(id, payload);
                        let tx = inbound_tx.lock().expect("inbound sender mutex poisoned").clone();
                        if let Some(tx) = tx {
                            let _ = tx.send(message);
                        }
                    }
                }
                // Stream ended; loop reconnects with whatever Last-Event-ID we saw.
            }
        });

        *self.stream_task.lock().expect("stream task mutex poisoned") = Some(handle);
    }

    async fn post_once(
        &self,
        message: &TransportMessage,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, TransportError> {
        let mut request = self
            .http
            .post(&self.base_url)
            .header("Content-Type", "application/json")
            .header("Mcp-Protocol-Version", &self.config.protocol_version)
            .body(message.payload.clone());

        if let Some(sid) = self.current_session_id() {
            request = request.header("Mcp-Session-Id", sid);
        }
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        request
            .send()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn handle_success_response(&self, response: reqwest::Response) -> TransportResult<()> {
        if let Some(sid) = response
            .headers()
            .get("Mcp-Session-Id")
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().expect("session id mutex poisoned") = Some(sid.to_string());
        }

        if !self.config.streaming {
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
            if !body.is_empty() {
                let id = mcp_wire::extract_id(&body)
                    .unwrap_or_else(|| mcp_core::RequestId::from(uuid::Uuid::new_v4().to_string()));
                let message = TransportMessage::new(id, body);
                let tx = self.inbound_tx.lock().expect("inbound sender mutex poisoned").clone();
                if let Some(tx) = tx {
                    let _ = tx.send(message);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpClientTransport {
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
        self.stop_flag.store(false, Ordering::Relaxed);
        if self.config.streaming {
            self.spawn_event_stream();
        }
        *self.state.lock().expect("state mutex poisoned") = TransportState::Connected;
        self.event_emitter
            .emit_connected(TransportType::Http, self.base_url.clone());
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.stream_task.lock().expect("stream task mutex poisoned").take() {
            handle.abort();
        }
        self.inbound_tx.lock().expect("inbound sender mutex poisoned").take();
        *self.state.lock().expect("state mutex poisoned") = TransportState::Disconnected;
        self.event_emitter
            .emit_disconnected(TransportType::Http, self.base_url.clone(), None);
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        let size = message.size();
        let bearer = self.auth.token().await;
        let response = self.post_once(&message, bearer.as_deref()).await?;

        let response = match response.status() {
            StatusCode::UNAUTHORIZED => {
                let www_authenticate = response
                    .headers()
                    .get("WWW-Authenticate")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let token = self.auth.on_unauthorized(www_authenticate.as_deref()).await?;
                self.post_once(&message, Some(&token)).await?
            }
            StatusCode::FORBIDDEN => {
                let www_authenticate = response
                    .headers()
                    .get("WWW-Authenticate")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                if www_authenticate.as_deref().is_some_and(|h| h.contains("insufficient_scope")) {
                    let token = self.auth.on_forbidden(www_authenticate.as_deref()).await?;
                    self.post_once(&message, Some(&token)).await?
                } else {
                    response
                }
            }
            _ => response,
        };

        if !response.status().is_success() {
            let status = response.status();
            return Err(TransportError::SendFailed(format!("server returned {status}")));
        }

        self.handle_success_response(response).await?;
        self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.metrics.bytes_sent.fetch_add(size as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
        let mut rx = self.inbound_rx.lock().await;
        match rx.recv().await {
            Some(message) => {
                self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                self.metrics
                    .bytes_received
                    .fetch_add(message.size() as u64, Ordering::Relaxed);
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }

    async fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    async fn configure(&self, _config: TransportConfig) -> TransportResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_disconnected() {
        let transport = HttpClientTransport::unauthenticated("http://127.0.0.1:0/mcp", HttpTransportConfig::new());
        assert_eq!(transport.state().await, TransportState::Disconnected);
    }

    #[tokio::test]
    async fn no_auth_provider_rejects_unauthorized() {
        let auth = NoAuth;
        assert!(auth.on_unauthorized(None).await.is_err());
        assert!(auth.on_forbidden(None).await.is_err());
        assert_eq!(auth.token().await, None);
    }

    #[tokio::test]
    async fn disconnect_closes_receive() {
        let transport = HttpClientTransport::unauthenticated("http://127.0.0.1:0/mcp", HttpTransportConfig::new());
        transport.disconnect().await.unwrap();
        assert_eq!(transport.receive().await.unwrap(), None);
    }
}
