//! In-process transport pair backed by bounded `tokio::sync::mpsc` channels.
//!
//! Unlike the stdio and HTTP transports, there is no wire framing here: a
//! [`TransportMessage`] placed on one end's sender arrives whole on the
//! other end's receiver. This is the transport used to wire a client and a
//! server together within the same process, and in tests that exercise the
//! session engine without spawning a subprocess or binding a socket.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use mcp_transport_traits::{
    AtomicMetrics, Transport, TransportCapabilities, TransportConfig, TransportError,
    TransportEventEmitter, TransportMessage, TransportMetrics, TransportResult, TransportState,
    TransportType, DEFAULT_MAX_MESSAGE_SIZE,
};
use tokio::sync::{Mutex as TokioMutex, mpsc};
use tracing::{debug, trace};

const CHANNEL_CAPACITY: usize = 256;

/// One end of an in-process transport pair.
///
/// Build a connected pair with [`memory_transport_pair`]; each end is an
/// independent [`Transport`] whose `receive()` stream ends once its peer is
/// dropped or disconnects.
pub struct MemoryTransport {
    state: Arc<StdMutex<TransportState>>,
    capabilities: TransportCapabilities,
    metrics: Arc<AtomicMetrics>,
    event_emitter: TransportEventEmitter,
    outbound: mpsc::Sender<TransportMessage>,
    inbound: Arc<TokioMutex<mpsc::Receiver<TransportMessage>>>,
    label: &'static str,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("label", &self.label)
            .field("state", &self.state)
            .finish()
    }
}

/// Build two connected [`MemoryTransport`]s: messages sent on one arrive on
/// the other's `receive()`.
#[must_use]
pub fn memory_transport_pair() -> (MemoryTransport, MemoryTransport) {
    let (tx_a, rx_a) = mpsc::channel(CHANNEL_CAPACITY);
    let (tx_b, rx_b) = mpsc::channel(CHANNEL_CAPACITY);

    let a = MemoryTransport::new(tx_a, rx_b, "a");
    let b = MemoryTransport::new(tx_b, rx_a, "b");
    (a, b)
}

impl MemoryTransport {
    fn new(
        outbound: mpsc::Sender<TransportMessage>,
        inbound: mpsc::Receiver<TransportMessage>,
        label: &'static str,
    ) -> Self {
        let (event_emitter, _) = TransportEventEmitter::new();
        Self {
            state: Arc::new(StdMutex::new(TransportState::Disconnected)),
            capabilities: TransportCapabilities {
                max_message_size: Some(DEFAULT_MAX_MESSAGE_SIZE),
                supports_compression: false,
                supports_streaming: true,
                supports_bidirectional: true,
                supports_multiplexing: true,
                compression_algorithms: Vec::new(),
                custom: std::collections::HashMap::new(),
            },
            metrics: Arc::new(AtomicMetrics::default()),
            event_emitter,
            outbound,
            inbound: Arc::new(TokioMutex::new(inbound)),
            label,
        }
    }

    fn set_state(&self, new_state: TransportState) {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if *state != new_state {
            trace!("memory transport {} state: {:?} -> {:?}", self.label, *state, new_state);
            *state = new_state.clone();
            match new_state {
                TransportState::Connected => {
                    self.event_emitter
                        .emit_connected(TransportType::InMemory, format!("memory://{}", self.label));
                }
                TransportState::Disconnected => {
                    self.event_emitter.emit_disconnected(
                        TransportType::InMemory,
                        format!("memory://{}", self.label),
                        None,
                    );
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::InMemory
    }

    fn capabilities(&self) -> &TransportCapabilities {
        &self.capabilities
    }

    async fn state(&self) -> TransportState {
        self.state.lock().expect("state mutex poisoned").clone()
    }

    async fn connect(&self) -> TransportResult<()> {
        if matches!(self.state().await, TransportState::Connected) {
            return Ok(());
        }
        self.metrics.connections.fetch_add(1, Ordering::Relaxed);
        self.set_state(TransportState::Connected);
        debug!("memory transport {} connected", self.label);
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.set_state(TransportState::Disconnected);
        debug!("memory transport {} disconnected", self.label);
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        if !matches!(self.state().await, TransportState::Connected) {
            return Err(TransportError::ConnectionFailed(
                "memory transport not connected".to_string(),
            ));
        }
        let size = message.size();
        self.outbound
            .send(message)
            .await
            .map_err(|_| TransportError::SendFailed("peer transport dropped".to_string()))?;
        self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.metrics.bytes_sent.fetch_add(size as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
        if !matches!(self.state().await, TransportState::Connected) {
            return Err(TransportError::ConnectionFailed(
                "memory transport not connected".to_string(),
            ));
        }
        let mut receiver = self.inbound.lock().await;
        match receiver.recv().await {
            Some(message) => {
                self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                self.metrics
                    .bytes_received
                    .fetch_add(message.size() as u64, Ordering::Relaxed);
                Ok(Some(message))
            }
            // The peer dropped or disconnected: this is the finite end of
            // the receive sequence, not an error.
            None => Ok(None),
        }
    }

    async fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    fn endpoint(&self) -> Option<String> {
        Some(format!("memory://{}", self.label))
    }

    async fn configure(&self, _config: TransportConfig) -> TransportResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mcp_core::RequestId;

    #[tokio::test]
    async fn delivers_message_to_peer() {
        let (a, b) = memory_transport_pair();
        a.connect().await.unwrap();
        b.connect().await.unwrap();

        let msg = TransportMessage::new(RequestId::from(1i64), Bytes::from_static(b"{}"));
        a.send(msg).await.unwrap();

        let received = b.receive().await.unwrap().unwrap();
        assert_eq!(received.id, RequestId::from(1i64));
    }

    #[tokio::test]
    async fn receive_ends_when_peer_dropped() {
        let (a, b) = memory_transport_pair();
        a.connect().await.unwrap();
        b.connect().await.unwrap();

        drop(a);
        let result = b.receive().await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn send_fails_before_connect() {
        let (a, _b) = memory_transport_pair();
        let msg = TransportMessage::new(RequestId::from(1i64), Bytes::from_static(b"{}"));
        assert!(a.send(msg).await.is_err());
    }
}
