//! The session engine: one [`Session`] per connected transport, running a
//! single background task that owns `transport.receive()` and dispatches
//! every inbound message — mirroring the dispatcher used on both the client
//! and server halves of the reference implementation this crate grew out
//! of, collapsed into one role-agnostic type.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use mcp_core::{Error, ErrorKind, RequestId};
use mcp_protocol::{is_list_changed_method, CapabilityGatedNotification, ClientCapabilities, ServerCapabilities};
use mcp_transport_traits::{Transport, TransportMessage};
use mcp_wire::{decode, encode, JsonRpcError, Message, Notification, Request, Response, ResponsePayload};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::pending::PendingRequests;
use crate::sanitize::sanitize_for_wire;

/// Default time a [`Session::request`] call waits for a reply before
/// giving up and sending `notifications/cancelled` for it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Handles an inbound request and produces the value that becomes the
/// `result` field of the reply (or an [`Error`] that becomes the
/// `error` field, sanitized first).
pub type RequestHandler =
    Arc<dyn Fn(String, Option<Value>, CancellationToken) -> BoxFuture<Result<Value, Error>> + Send + Sync>;

/// Handles an inbound notification. Fire-and-forget: nothing is sent back.
pub type NotificationHandler = Arc<dyn Fn(String, Option<Value>) -> BoxFuture<()> + Send + Sync>;

/// Which side of the connection this session represents. Only the side
/// that *sends* a given list-changed notification needs to enforce its
/// gate, so outbound capability checks look at the relevant half only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// The capability set this session advertised, set once the handshake
/// completes via [`Session::set_capabilities`]. Used only to gate
/// outbound notifications this side sends.
#[derive(Debug, Clone)]
pub enum Capabilities {
    Server(ServerCapabilities),
    Client(ClientCapabilities),
    Unset,
}

/// The connection lifecycle. Valid transitions follow the arrows;
/// [`Session::transition`] rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Connecting,
    Initializing,
    Initialized,
    Disconnecting,
    Closed,
}

impl SessionState {
    fn can_transition_to(self, next: Self) -> bool {
        use SessionState::{Closed, Connecting, Created, Disconnecting, Initialized, Initializing};
        matches!(
            (self, next),
            (Created, Connecting)
                | (Connecting, Initializing)
                | (Initializing, Initialized)
                | (Initialized, Disconnecting)
                | (Connecting, Disconnecting)
                | (Initializing, Disconnecting)
                | (Disconnecting, Closed)
                | (_, Closed)
        )
    }
}

/// A progress update delivered for a `progressToken` a caller is
/// listening on, via [`Session::track_progress`].
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub progress: f64,
    pub total: Option<f64>,
    pub message: Option<String>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    pending: PendingRequests,
    next_id: AtomicI64,
    state: Mutex<SessionState>,
    role: Role,
    capabilities: Mutex<Capabilities>,
    request_handler: Mutex<Option<RequestHandler>>,
    notification_handler: Mutex<Option<NotificationHandler>>,
    cancellations: Mutex<HashMap<RequestId, CancellationToken>>,
    progress_listeners: Mutex<HashMap<String, mpsc::UnboundedSender<ProgressUpdate>>>,
    shutdown: Notify,
    request_timeout: Duration,
}

/// A live JSON-RPC session over one [`Transport`].
///
/// Cloning a `Session` is cheap and shares the same underlying state; the
/// background dispatch task is spawned once, by [`Session::spawn`].
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.inner.role)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session over `transport` and spawn its dispatch task. The
    /// transport is expected to already be connected; call
    /// [`Session::transition`] to move through the handshake states as
    /// `initialize` proceeds.
    #[must_use]
    pub fn spawn(transport: Arc<dyn Transport>, role: Role) -> Self {
        Self::spawn_with_timeout(transport, role, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Like [`Session::spawn`], with a non-default request timeout.
    #[must_use]
    pub fn spawn_with_timeout(transport: Arc<dyn Transport>, role: Role, request_timeout: Duration) -> Self {
        let inner = Arc::new(Inner {
            transport,
            pending: PendingRequests::new(),
            next_id: AtomicI64::new(1),
            state: Mutex::new(SessionState::Created),
            role,
            capabilities: Mutex::new(Capabilities::Unset),
            request_handler: Mutex::new(None),
            notification_handler: Mutex::new(None),
            cancellations: Mutex::new(HashMap::new()),
            progress_listeners: Mutex::new(HashMap::new()),
            shutdown: Notify::new(),
            request_timeout,
        });
        let session = Self { inner };
        session.spawn_dispatch_loop();
        session
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.inner.state.lock().expect("session state mutex poisoned")
    }

    /// Move to `next`, rejecting transitions the state machine doesn't
    /// allow.
    pub fn transition(&self, next: SessionState) -> Result<(), Error> {
        let mut state = self.inner.state.lock().expect("session state mutex poisoned");
        if !state.can_transition_to(next) {
            return Err(Error::new(
                ErrorKind::Internal,
                format!("cannot transition session from {state:?} to {next:?}"),
            ));
        }
        *state = next;
        Ok(())
    }

    /// Record the capability set this side advertised during the
    /// handshake. Must be called before [`Session::notify`] is used for
    /// anything gated, or gated notifications are rejected.
    pub fn set_capabilities(&self, capabilities: Capabilities) {
        *self.inner.capabilities.lock().expect("capabilities mutex poisoned") = capabilities;
    }

    /// Register the handler invoked for inbound requests. Replaces any
    /// previously registered handler.
    pub fn set_request_handler(&self, handler: RequestHandler) {
        *self.inner.request_handler.lock().expect("handler mutex poisoned") = Some(handler);
    }

    /// Register the handler invoked for inbound notifications (other than
    /// the built-in `notifications/cancelled`/`notifications/progress`,
    /// which the session handles itself).
    pub fn set_notification_handler(&self, handler: NotificationHandler) {
        *self.inner.notification_handler.lock().expect("handler mutex poisoned") = Some(handler);
    }

    /// Send a request and wait for its response, or time out.
    pub async fn request(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value, Error> {
        let id = RequestId::Number(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let rx = self.inner.pending.register(id.clone());

        let request = Request {
            id: id.clone(),
            method: method.into(),
            params,
        };
        self.send_message(Message::Request(request)).await?;

        let outcome = tokio::time::timeout(self.inner.request_timeout, rx).await;
        match outcome {
            Ok(Ok(response)) => match response.payload {
                ResponsePayload::Success(value) => Ok(value),
                ResponsePayload::Error(err) => Err(Error::json_rpc_code(err.code, err.message)),
            },
            Ok(Err(_canceled)) => Err(Error::new(ErrorKind::Cancelled, "request was cancelled before a reply arrived")),
            Err(_elapsed) => {
                self.inner.pending.forget(&id);
                let _ = self.send_cancelled(id, Some("timed out waiting for a response".to_string())).await;
                Err(Error::new(ErrorKind::Timeout, "request timed out waiting for a response"))
            }
        }
    }

    /// Send a one-way notification. Rejected locally, without touching
    /// the wire, if `method` is gated on a capability this side never
    /// advertised.
    pub async fn notify(&self, method: impl Into<String>, params: Option<Value>) -> Result<(), Error> {
        let method = method.into();
        self.check_notification_gate(&method)?;
        self.send_message(Message::Notification(Notification { method, params })).await
    }

    /// Ask the peer to stop working on a request this side previously
    /// sent, and stop waiting for its reply.
    pub async fn cancel(&self, id: RequestId, reason: Option<String>) -> Result<(), Error> {
        self.inner.pending.forget(&id);
        self.send_cancelled(id, reason).await
    }

    /// Report progress for a `progressToken` a peer attached to one of
    /// its requests. Always permitted — progress notifications aren't
    /// capability-gated.
    pub async fn send_progress(
        &self,
        token: impl Into<String>,
        progress: f64,
        total: Option<f64>,
        message: Option<String>,
    ) -> Result<(), Error> {
        let mut payload = json!({ "progressToken": token.into(), "progress": progress });
        if let Some(total) = total {
            payload["total"] = json!(total);
        }
        if let Some(message) = message {
            payload["message"] = json!(message);
        }
        self.send_message(Message::Notification(Notification {
            method: mcp_protocol::PROGRESS.to_string(),
            params: Some(payload),
        }))
        .await
    }

    /// Listen for progress updates reported against `token`, which this
    /// side must have attached to an outbound request's `progressToken`
    /// param. Dropping the receiver stops delivery.
    pub fn track_progress(&self, token: impl Into<String>) -> mpsc::UnboundedReceiver<ProgressUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .progress_listeners
            .lock()
            .expect("progress listeners mutex poisoned")
            .insert(token.into(), tx);
        rx
    }

    /// Stop the dispatch loop and disconnect the transport.
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.transition(SessionState::Disconnecting)?;
        self.inner.shutdown.notify_waiters();
        self.inner
            .transport
            .disconnect()
            .await
            .map_err(|e| Error::new(ErrorKind::Transport, e.to_string()))?;
        self.transition(SessionState::Closed)?;
        Ok(())
    }

    fn check_notification_gate(&self, method: &str) -> Result<(), Error> {
        let Some(gate) = is_list_changed_method(method) else {
            return Ok(());
        };
        let capabilities = self.inner.capabilities.lock().expect("capabilities mutex poisoned");
        let allowed = match (&*capabilities, gate) {
            (Capabilities::Server(caps), CapabilityGatedNotification::ToolsListChanged) => caps.supports_tools_list_changed(),
            (Capabilities::Server(caps), CapabilityGatedNotification::ResourcesListChanged) => {
                caps.supports_resources_list_changed()
            }
            (Capabilities::Server(caps), CapabilityGatedNotification::PromptsListChanged) => {
                caps.supports_prompts_list_changed()
            }
            (Capabilities::Server(caps), CapabilityGatedNotification::ResourcesUpdated) => caps.supports_resources_updated(),
            (Capabilities::Client(caps), CapabilityGatedNotification::RootsListChanged) => caps.supports_roots_list_changed(),
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::CapabilityNotAdvertised,
                format!("cannot send this notification: `{}` was not advertised", gate.capability_name()),
            ))
        }
    }

    async fn send_cancelled(&self, id: RequestId, reason: Option<String>) -> Result<(), Error> {
        let mut payload = json!({ "requestId": id });
        if let Some(reason) = reason {
            payload["reason"] = json!(reason);
        }
        self.send_message(Message::Notification(Notification {
            method: mcp_protocol::CANCELLED.to_string(),
            params: Some(payload),
        }))
        .await
    }

    async fn send_message(&self, message: Message) -> Result<(), Error> {
        let bytes = encode(&message);
        let id = message_id(&message);
        self.inner
            .transport
            .send(TransportMessage::new(id, Bytes::from(bytes)))
            .await
            .map_err(|e| Error::new(ErrorKind::Transport, e.to_string()))
    }

    fn spawn_dispatch_loop(&self) {
        let session = self.clone();
        tokio::spawn(async move {
            let mut consecutive_errors: u32 = 0;
            loop {
                let received = tokio::select! {
                    biased;
                    () = session.inner.shutdown.notified() => break,
                    result = session.inner.transport.receive() => result,
                };
                match received {
                    Ok(Some(message)) => {
                        consecutive_errors = 0;
                        session.handle_inbound(message.payload);
                    }
                    Ok(None) => {
                        debug!("transport closed, stopping dispatch loop");
                        session.inner.pending.fail_all("transport closed before a reply arrived");
                        break;
                    }
                    Err(error) => {
                        consecutive_errors += 1;
                        if consecutive_errors <= 5 {
                            warn!(%error, consecutive_errors, "error receiving from transport");
                        }
                        let delay = Duration::from_millis(50u64.saturating_mul(u64::from(consecutive_errors.min(20))));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        });
    }

    fn handle_inbound(&self, payload: Bytes) {
        let message = match decode(&payload) {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, "received an unparseable payload; recovering via extractId");
                self.recover_unparseable(&payload);
                return;
            }
        };
        match message {
            Message::Response(response) => {
                if !self.inner.pending.complete(response.clone()) {
                    debug!(id = ?response.id, "response for unknown or expired request id");
                    let failed_one = match &response.id {
                        Some(id) => self.inner.pending.fail_matching(id, "received a response for an unknown request id"),
                        None => false,
                    };
                    if !failed_one {
                        self.inner.pending.fail_all("received a response with no identifiable pending request");
                    }
                }
            }
            Message::Notification(notification) => self.handle_notification(notification),
            Message::Request(request) => self.handle_request(request),
        }
    }

    /// A payload that failed full decoding still might carry a recoverable
    /// `id`. If it matches exactly one pending request, fail only that one;
    /// otherwise fail every pending request. This is the contract that lets
    /// callers never hang after a malformed reply.
    fn recover_unparseable(&self, payload: &Bytes) {
        match mcp_wire::extract_id(payload) {
            Some(id) => {
                if !self.inner.pending.fail_matching(&id, "malformed response payload") {
                    self.inner.pending.fail_all("malformed response payload with an id that matches no pending request");
                }
            }
            None => self.inner.pending.fail_all("malformed response payload with no identifiable request id"),
        }
    }

    fn handle_notification(&self, notification: Notification) {
        match notification.method.as_str() {
            mcp_protocol::CANCELLED => self.handle_cancelled(notification.params),
            mcp_protocol::PROGRESS => self.handle_progress(notification.params),
            _ => {
                let handler = self
                    .inner
                    .notification_handler
                    .lock()
                    .expect("handler mutex poisoned")
                    .clone();
                match handler {
                    Some(handler) => {
                        tokio::spawn(handler(notification.method, notification.params));
                    }
                    None => debug!(method = %notification.method, "no notification handler registered"),
                }
            }
        }
    }

    fn handle_cancelled(&self, params: Option<Value>) {
        let Some(request_id) = params.as_ref().and_then(|p| p.get("requestId")).cloned() else {
            warn!("received notifications/cancelled with no requestId");
            return;
        };
        let id: RequestId = match serde_json::from_value(request_id) {
            Ok(id) => id,
            Err(_) => return,
        };
        if let Some(token) = self.inner.cancellations.lock().expect("cancellations mutex poisoned").get(&id) {
            token.cancel();
        }
    }

    fn handle_progress(&self, params: Option<Value>) {
        let Some(params) = params else { return };
        let Some(token) = params.get("progressToken").and_then(|v| v.as_str()) else {
            return;
        };
        let listeners = self.inner.progress_listeners.lock().expect("progress listeners mutex poisoned");
        let Some(sender) = listeners.get(token) else {
            return;
        };
        let progress = params.get("progress").and_then(Value::as_f64).unwrap_or(0.0);
        let total = params.get("total").and_then(Value::as_f64);
        let message = params.get("message").and_then(|v| v.as_str()).map(str::to_string);
        let _ = sender.send(ProgressUpdate { progress, total, message });
    }

    fn handle_request(&self, request: Request) {
        if request.method == mcp_protocol::PING {
            let session = self.clone();
            tokio::spawn(async move {
                let _ = session.send_message(Message::Response(Response::success(request.id, json!({})))).await;
            });
            return;
        }

        let handler = self.inner.request_handler.lock().expect("handler mutex poisoned").clone();
        let Some(handler) = handler else {
            let session = self.clone();
            tokio::spawn(async move {
                let error = Error::new(ErrorKind::MethodNotFound, format!("method not found: {}", request.method));
                let (code, message) = sanitize_for_wire(&error);
                let response = Response {
                    id: Some(request.id),
                    payload: ResponsePayload::Error(JsonRpcError { code, message, data: None }),
                };
                let _ = session.send_message(Message::Response(response)).await;
            });
            return;
        };

        let token = CancellationToken::new();
        self.inner
            .cancellations
            .lock()
            .expect("cancellations mutex poisoned")
            .insert(request.id.clone(), token.clone());

        let session = self.clone();
        tokio::spawn(async move {
            let outcome = handler(request.method, request.params, token).await;
            session
                .inner
                .cancellations
                .lock()
                .expect("cancellations mutex poisoned")
                .remove(&request.id);

            let response = match outcome {
                Ok(value) => Response::success(request.id, value),
                Err(error) => {
                    let (code, message) = sanitize_for_wire(&error);
                    Response {
                        id: Some(request.id),
                        payload: ResponsePayload::Error(JsonRpcError { code, message, data: None }),
                    }
                }
            };
            let _ = session.send_message(Message::Response(response)).await;
        });
    }
}

fn message_id(message: &Message) -> RequestId {
    match message {
        Message::Request(r) => r.id.clone(),
        Message::Response(r) => r.id.clone().unwrap_or_else(|| RequestId::Number(0)),
        Message::Notification(_) => RequestId::String("notification".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_transport_memory::memory_transport_pair;
    use std::time::Duration as StdDuration;

    async fn connected_pair() -> (Arc<dyn Transport>, Arc<dyn Transport>) {
        let (a, b) = memory_transport_pair();
        let a: Arc<dyn Transport> = Arc::new(a);
        let b: Arc<dyn Transport> = Arc::new(b);
        a.connect().await.unwrap();
        b.connect().await.unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn request_response_round_trip() {
        let (client_transport, server_transport) = connected_pair().await;
        let client = Session::spawn(client_transport, Role::Client);
        let server = Session::spawn(server_transport, Role::Server);

        server.set_request_handler(Arc::new(|method, _params, _token| {
            Box::pin(async move {
                assert_eq!(method, "echo");
                Ok(json!({ "ok": true }))
            })
        }));

        let result = client.request("echo", None).await.unwrap();
        assert_eq!(result, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn method_not_found_comes_back_as_an_error() {
        let (client_transport, server_transport) = connected_pair().await;
        let client = Session::spawn(client_transport, Role::Client);
        let _server = Session::spawn(server_transport, Role::Server);

        let error = client.request("nonexistent", None).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::MethodNotFound);
    }

    #[tokio::test]
    async fn notify_rejects_ungated_capability() {
        let (client_transport, _server_transport) = connected_pair().await;
        let client = Session::spawn(client_transport, Role::Client);
        client.set_capabilities(Capabilities::Client(ClientCapabilities::default()));

        let error = client.notify("notifications/roots/list_changed", None).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::CapabilityNotAdvertised);
    }

    #[tokio::test]
    async fn notify_allows_advertised_capability() {
        let (client_transport, server_transport) = connected_pair().await;
        let client = Session::spawn(client_transport, Role::Client);
        let _server = Session::spawn(server_transport, Role::Server);
        client.set_capabilities(Capabilities::Client(
            ClientCapabilities {
                roots: Some(mcp_protocol::ListChangedCapability { list_changed: Some(true) }),
                ..Default::default()
            }
            .normalize(),
        ));

        client.notify("notifications/roots/list_changed", None).await.unwrap();
    }

    #[tokio::test]
    async fn state_machine_rejects_invalid_transitions() {
        let (client_transport, _server_transport) = connected_pair().await;
        let client = Session::spawn(client_transport, Role::Client);
        assert_eq!(client.state(), SessionState::Created);
        assert!(client.transition(SessionState::Initialized).is_err());
        client.transition(SessionState::Connecting).unwrap();
        client.transition(SessionState::Initializing).unwrap();
        client.transition(SessionState::Initialized).unwrap();
    }

    #[tokio::test]
    async fn malformed_payload_with_matching_id_fails_only_that_request() {
        let (client_transport, server_transport) = connected_pair().await;
        let client = Session::spawn(client_transport, Role::Client);

        // This is the first request the client issues, so it's assigned id 1.
        let pending = client.clone();
        let in_flight = tokio::spawn(async move { pending.request("one", None).await });
        tokio::time::sleep(StdDuration::from_millis(20)).await;

        // Valid JSON, carries the matching id, but isn't a well-formed
        // JSON-RPC response (no result/error member).
        server_transport
            .send(TransportMessage::new(RequestId::Number(0), Bytes::from_static(br#"{"id":1,"garbage":true}"#)))
            .await
            .unwrap();

        let outcome = in_flight.await.unwrap();
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn malformed_payload_with_no_id_fails_all_pending_requests() {
        let (client_transport, server_transport) = connected_pair().await;
        let client = Session::spawn(client_transport, Role::Client);

        let a = client.clone();
        let b = client.clone();
        let first = tokio::spawn(async move { a.request("one", None).await });
        let second = tokio::spawn(async move { b.request("two", None).await });
        tokio::time::sleep(StdDuration::from_millis(20)).await;

        server_transport.send(TransportMessage::new(RequestId::Number(0), Bytes::from_static(b"not json at all {"))).await.unwrap();

        assert!(first.await.unwrap().is_err());
        assert!(second.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn progress_updates_are_delivered() {
        let (client_transport, server_transport) = connected_pair().await;
        let client = Session::spawn(client_transport, Role::Client);
        let server = Session::spawn(server_transport, Role::Server);

        let mut updates = client.track_progress("tok-1");
        server.send_progress("tok-1", 0.5, Some(1.0), Some("halfway".to_string())).await.unwrap();

        let update = tokio::time::timeout(StdDuration::from_secs(1), updates.recv()).await.unwrap().unwrap();
        assert_eq!(update.progress, 0.5);
        assert_eq!(update.message.as_deref(), Some("halfway"));
    }
}
