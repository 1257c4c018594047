//! The pending-requests table: correlates outbound requests with the
//! response that eventually arrives over the same transport.
//!
//! Mirrors the dispatcher pattern used on both halves of the session: a
//! single background task owns `transport.receive()`, and callers of
//! [`Session::request`](crate::session::Session::request) register a
//! oneshot waiter here before the request goes out on the wire.

use std::collections::HashMap;
use std::sync::Mutex;

use mcp_core::RequestId;
use mcp_wire::{JsonRpcError, Response, ResponsePayload};
use tokio::sync::oneshot;

/// JSON-RPC `-32700`: used to fail pending requests locally when a
/// malformed or unmatched payload arrives, per the fail-one-vs-fail-all
/// contract.
const PARSE_ERROR_CODE: i64 = -32700;

/// Table of in-flight request ids awaiting a response.
#[derive(Default)]
pub struct PendingRequests {
    waiters: Mutex<HashMap<RequestId, oneshot::Sender<Response>>>,
}

impl PendingRequests {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id`, to be called before the request is sent.
    pub fn register(&self, id: RequestId) -> oneshot::Receiver<Response> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().expect("pending requests mutex poisoned").insert(id, tx);
        rx
    }

    /// Complete the waiter for `response.id`, if one is still registered.
    ///
    /// Returns `true` if a waiter was found and notified. A `false` return
    /// (unknown or expired id) is not itself an error — the caller decides
    /// whether it's worth logging.
    pub fn complete(&self, response: Response) -> bool {
        let Some(id) = response.id.clone() else {
            return false;
        };
        let waiter = self.waiters.lock().expect("pending requests mutex poisoned").remove(&id);
        match waiter {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// Drop the waiter for `id` without completing it, e.g. when the caller
    /// gave up (timeout, cancellation).
    pub fn forget(&self, id: &RequestId) {
        self.waiters.lock().expect("pending requests mutex poisoned").remove(id);
    }

    /// Fail exactly the waiter registered for `id`, if any, with a local
    /// parse error. Returns `true` if a waiter was found and failed.
    ///
    /// Used when a malformed or unmatched payload still carries an id that
    /// identifies exactly one pending request — the "fail one" half of the
    /// fail-one-vs-fail-all contract.
    pub fn fail_matching(&self, id: &RequestId, message: impl Into<String>) -> bool {
        let waiter = self.waiters.lock().expect("pending requests mutex poisoned").remove(id);
        match waiter {
            Some(tx) => tx
                .send(Response {
                    id: Some(id.clone()),
                    payload: ResponsePayload::Error(JsonRpcError { code: PARSE_ERROR_CODE, message: message.into(), data: None }),
                })
                .is_ok(),
            None => false,
        }
    }

    /// Fail every currently pending request with a local parse error and
    /// clear the table. Used when a malformed payload carries no id, or an
    /// id that matches nothing — the "fail all" half of the contract, and
    /// when the underlying transport closes with requests still in flight.
    pub fn fail_all(&self, message: impl Into<String>) {
        let message = message.into();
        let waiters: Vec<_> = std::mem::take(&mut *self.waiters.lock().expect("pending requests mutex poisoned")).into_iter().collect();
        for (id, tx) in waiters {
            let _ = tx.send(Response {
                id: Some(id),
                payload: ResponsePayload::Error(JsonRpcError { code: PARSE_ERROR_CODE, message: message.clone(), data: None }),
            });
        }
    }

    /// Number of requests currently awaiting a response.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waiters.lock().expect("pending requests mutex poisoned").len()
    }

    /// Whether there are no in-flight requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn completes_registered_waiter() {
        let pending = PendingRequests::new();
        let id = RequestId::Number(1);
        let rx = pending.register(id.clone());

        let response = Response {
            id: Some(id),
            payload: ResponsePayload::Success(json!({"ok": true})),
        };
        assert!(pending.complete(response));

        let received = rx.await.unwrap();
        assert_eq!(received.payload, ResponsePayload::Success(json!({"ok": true})));
    }

    #[test]
    fn unknown_id_is_not_completed() {
        let pending = PendingRequests::new();
        let response = Response {
            id: Some(RequestId::Number(99)),
            payload: ResponsePayload::Success(json!(null)),
        };
        assert!(!pending.complete(response));
    }

    #[test]
    fn forget_removes_without_completing() {
        let pending = PendingRequests::new();
        let id = RequestId::String("a".into());
        let _rx = pending.register(id.clone());
        assert_eq!(pending.len(), 1);
        pending.forget(&id);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn fail_matching_fails_only_the_named_entry() {
        let pending = PendingRequests::new();
        let target = RequestId::Number(1);
        let other = RequestId::Number(2);
        let target_rx = pending.register(target.clone());
        let other_rx = pending.register(other.clone());

        assert!(pending.fail_matching(&target, "malformed response payload"));
        assert_eq!(pending.len(), 1);

        let failed = target_rx.await.unwrap();
        assert!(matches!(failed.payload, ResponsePayload::Error(_)));
        pending.forget(&other);
        drop(other_rx);
    }

    #[test]
    fn fail_matching_unknown_id_returns_false() {
        let pending = PendingRequests::new();
        assert!(!pending.fail_matching(&RequestId::Number(1), "no such request"));
    }

    #[tokio::test]
    async fn fail_all_fails_every_pending_entry_and_empties_the_table() {
        let pending = PendingRequests::new();
        let a = pending.register(RequestId::Number(1));
        let b = pending.register(RequestId::String("x".into()));

        pending.fail_all("transport closed");
        assert!(pending.is_empty());

        assert!(matches!(a.await.unwrap().payload, ResponsePayload::Error(_)));
        assert!(matches!(b.await.unwrap().payload, ResponsePayload::Error(_)));
    }
}
