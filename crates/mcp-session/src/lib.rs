//! # Session engine
//!
//! The async, bidirectional JSON-RPC 2.0 engine that sits on top of a
//! [`Transport`](mcp_transport_traits::Transport): request/response
//! correlation, cancellation, progress reporting, capability-gated
//! notifications, and the connection lifecycle state machine.
//!
//! A [`Session`] owns exactly one transport and spawns exactly one
//! background task that reads from it; everything else — requests sent,
//! notifications received, cancellations — flows through that task.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mcp_session::{Role, Session};
//!
//! let session = Session::spawn(transport, Role::Client);
//! let result = session.request("tools/list", None).await?;
//! ```

mod pending;
mod sanitize;
mod session;

pub use pending::PendingRequests;
pub use sanitize::sanitize_for_wire;
pub use session::{
    Capabilities, NotificationHandler, ProgressUpdate, RequestHandler, Role, Session, SessionState,
    DEFAULT_REQUEST_TIMEOUT,
};
