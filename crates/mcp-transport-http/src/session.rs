//! Server-side HTTP session manager.
//!
//! Tracks one entry per `Mcp-Session-Id`: a bounded replay buffer (for
//! `Last-Event-ID` resumption) and the set of currently-attached SSE
//! subscribers. This is the in-memory reference implementation; storage
//! backends are not pluggable here, unlike the OAuth discovery cache.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use mcp_core::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{too_many_sessions, unknown_session};

/// Generates a fresh, unguessable session id.
#[must_use]
pub fn generate_session_id() -> String {
    format!("mcp-{}", Uuid::new_v4().simple())
}

/// A single buffered event, keyed by its SSE id for replay lookups.
#[derive(Clone, Debug)]
pub struct StoredEvent {
    /// SSE event id.
    pub id: String,
    /// Raw JSON-RPC payload.
    pub payload: Bytes,
}

struct SessionEntry {
    replay_buffer: VecDeque<StoredEvent>,
    replay_capacity: usize,
    subscribers: Vec<mpsc::UnboundedSender<StoredEvent>>,
    last_activity: Instant,
}

impl SessionEntry {
    fn new(replay_capacity: usize) -> Self {
        Self {
            replay_buffer: VecDeque::with_capacity(replay_capacity.min(64)),
            replay_capacity,
            subscribers: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    fn broadcast(&mut self, event: StoredEvent) {
        if self.replay_buffer.len() >= self.replay_capacity {
            self.replay_buffer.pop_front();
        }
        self.replay_buffer.push_back(event.clone());
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        self.last_activity = Instant::now();
    }

    fn replay_from(&self, last_event_id: &str) -> Vec<StoredEvent> {
        let mut found = false;
        self.replay_buffer
            .iter()
            .filter(|event| {
                if found {
                    true
                } else if event.id == last_event_id {
                    found = true;
                    false
                } else {
                    false
                }
            })
            .cloned()
            .collect()
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoredEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }
}

/// One per-session slot: the inbound channel a `POST` handler feeds, paired
/// with the broadcast/replay state a `GET` (SSE) handler reads from.
struct Session {
    entry: Arc<StdMutex<SessionEntry>>,
    inbound_tx: mpsc::Sender<Bytes>,
}

/// In-memory map from session id to session state, enforcing `max_sessions`.
#[derive(Debug)]
pub struct HttpSessionManager {
    sessions: DashMap<String, Session>,
    max_sessions: usize,
    replay_capacity: usize,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

const INBOUND_CHANNEL_CAPACITY: usize = 256;

impl HttpSessionManager {
    /// Create a manager admitting at most `max_sessions` concurrent sessions,
    /// each retaining up to `replay_capacity` buffered events for replay.
    #[must_use]
    pub fn new(max_sessions: usize, replay_capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
            replay_capacity,
        }
    }

    /// Create a new session, returning its id and the receiving half of its
    /// inbound channel. Fails once `max_sessions` are live.
    pub fn create_session(&self) -> Result<(String, mpsc::Receiver<Bytes>), Error> {
        if self.sessions.len() >= self.max_sessions {
            return Err(too_many_sessions());
        }
        let id = generate_session_id();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        self.sessions.insert(
            id.clone(),
            Session {
                entry: Arc::new(StdMutex::new(SessionEntry::new(self.replay_capacity))),
                inbound_tx,
            },
        );
        Ok((id, inbound_rx))
    }

    /// Deliver an inbound JSON-RPC payload (typically a `POST` body) to the
    /// session's transport-facing receive queue.
    pub async fn deliver_inbound(
        &self,
        session_id: &str,
        payload: Bytes,
    ) -> Result<(), Error> {
        let tx = self
            .sessions
            .get(session_id)
            .map(|s| s.inbound_tx.clone())
            .ok_or_else(|| unknown_session(session_id))?;
        tx.send(payload)
            .await
            .map_err(|_| unknown_session(session_id))
    }

    /// Broadcast an outbound event to every SSE stream currently attached to
    /// the session, and buffer it for replay.
    pub fn broadcast(
        &self,
        session_id: &str,
        event_id: String,
        payload: Bytes,
    ) -> Result<(), Error> {
        let entry = self
            .sessions
            .get(session_id)
            .map(|s| s.entry.clone())
            .ok_or_else(|| unknown_session(session_id))?;
        entry
            .lock()
            .expect("session entry mutex poisoned")
            .broadcast(StoredEvent {
                id: event_id,
                payload,
            });
        Ok(())
    }

    /// Attach a new SSE subscriber, returning replayed events (if
    /// `last_event_id` was given) followed by a live receiver for new ones.
    pub fn subscribe(
        &self,
        session_id: &str,
        last_event_id: Option<&str>,
    ) -> Result<(Vec<StoredEvent>, mpsc::UnboundedReceiver<StoredEvent>), Error> {
        let entry = self
            .sessions
            .get(session_id)
            .map(|s| s.entry.clone())
            .ok_or_else(|| unknown_session(session_id))?;
        let mut guard = entry.lock().expect("session entry mutex poisoned");
        let replay = last_event_id.map(|id| guard.replay_from(id)).unwrap_or_default();
        let rx = guard.subscribe();
        Ok((replay, rx))
    }

    /// Whether a session id is currently known.
    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Remove a session, dropping its buffer and disconnecting all
    /// subscribers.
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Remove sessions that have had no outbound activity for `idle_timeout`.
    ///
    /// Returns the number of sessions removed.
    pub fn evict_idle(&self, idle_timeout: Duration) -> usize {
        let now = Instant::now();
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| {
                let last_activity = entry
                    .value()
                    .entry
                    .lock()
                    .expect("session entry mutex poisoned")
                    .last_activity;
                now.duration_since(last_activity) > idle_timeout
            })
            .map(|entry| entry.key().clone())
            .collect();
        let count = stale.len();
        for id in stale {
            self.sessions.remove(&id);
        }
        count
    }

    /// Current number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no live sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enforces_max_sessions() {
        let manager = HttpSessionManager::new(1, 10);
        assert!(manager.create_session().is_ok());
        let err = manager.create_session().unwrap_err();
        assert_eq!(err.kind, mcp_core::ErrorKind::TooManySessions);
    }

    #[tokio::test]
    async fn delivers_inbound_payload() {
        let manager = HttpSessionManager::new(10, 10);
        let (id, mut rx) = manager.create_session().unwrap();

        manager
            .deliver_inbound(&id, Bytes::from_static(b"{}"))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"{}"));
    }

    #[tokio::test]
    async fn unknown_session_rejected() {
        let manager = HttpSessionManager::new(10, 10);
        let err = manager
            .deliver_inbound("nope", Bytes::from_static(b"{}"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, mcp_core::ErrorKind::UnknownSession);
    }

    #[tokio::test]
    async fn replays_events_after_last_event_id() {
        let manager = HttpSessionManager::new(10, 10);
        let (id, _rx) = manager.create_session().unwrap();

        manager
            .broadcast(&id, "1".into(), Bytes::from_static(b"a"))
            .unwrap();
        manager
            .broadcast(&id, "2".into(), Bytes::from_static(b"b"))
            .unwrap();
        manager
            .broadcast(&id, "3".into(), Bytes::from_static(b"c"))
            .unwrap();

        let (replay, _live) = manager.subscribe(&id, Some("1")).unwrap();
        assert_eq!(replay.len(), 2);
        assert_eq!(replay[0].id, "2");
        assert_eq!(replay[1].id, "3");
    }

    #[tokio::test]
    async fn replay_buffer_is_bounded() {
        let manager = HttpSessionManager::new(10, 2);
        let (id, _rx) = manager.create_session().unwrap();

        for i in 0..5 {
            manager
                .broadcast(&id, i.to_string(), Bytes::from_static(b"x"))
                .unwrap();
        }

        let (replay, _live) = manager.subscribe(&id, None).unwrap();
        assert_eq!(replay.len(), 0); // subscribe without last_event_id replays nothing
    }

    #[tokio::test]
    async fn live_subscriber_receives_new_broadcasts() {
        let manager = HttpSessionManager::new(10, 10);
        let (id, _rx) = manager.create_session().unwrap();

        let (_replay, mut live) = manager.subscribe(&id, None).unwrap();
        manager
            .broadcast(&id, "1".into(), Bytes::from_static(b"hi"))
            .unwrap();

        let event = live.recv().await.unwrap();
        assert_eq!(event.id, "1");
    }

    #[test]
    fn removes_session() {
        let manager = HttpSessionManager::new(10, 10);
        let (id, _rx) = manager.create_session().unwrap();
        assert!(manager.contains(&id));
        assert!(manager.remove(&id));
        assert!(!manager.contains(&id));
    }
}
