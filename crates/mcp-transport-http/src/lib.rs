//! # Streamable HTTP transport
//!
//! Server and client halves of the MCP streamable HTTP transport: JSON-RPC
//! requests over `POST`, replies and server-initiated messages over either
//! the `POST` response body or a standing `GET` Server-Sent Events stream.
//!
//! - [`HttpSessionManager`] tracks server-side sessions (in-memory only; see
//!   [`session`] module docs).
//! - [`server::router`] builds the axum `Router` serving `POST`/`GET`/`DELETE`
//!   on the configured endpoint, handing off a [`server::HttpServerTransport`]
//!   per new session.
//! - [`client::HttpClientTransport`] is the corresponding client-side
//!   [`Transport`] implementation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mcp_transport_http::{HttpTransportConfig, server};
//!
//! let (router, mut new_sessions) = server::router(HttpTransportConfig::new());
//! tokio::spawn(async move {
//!     while let Some(transport) = new_sessions.recv().await {
//!         // hand `transport` to a new mcp_session::Session
//!     }
//! });
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod sse;

pub use client::{HttpAuthProvider, HttpClientTransport, NoAuth};
pub use config::HttpTransportConfig;
pub use server::HttpServerTransport;
pub use session::{HttpSessionManager, StoredEvent};
pub use sse::{SseEncoder, SseEvent, SseEventBuilder, SseParser};

pub use mcp_transport_traits::{
    Transport, TransportCapabilities, TransportConfig, TransportError, TransportMessage,
    TransportMetrics, TransportResult, TransportState, TransportType,
};

/// Streamable HTTP header names.
pub mod headers {
    /// Session ID header for tracking stateful connections.
    pub const MCP_SESSION_ID: &str = "Mcp-Session-Id";

    /// Protocol version header.
    pub const MCP_PROTOCOL_VERSION: &str = "Mcp-Protocol-Version";

    /// Last event ID header for SSE resumption.
    pub const LAST_EVENT_ID: &str = "Last-Event-ID";

    /// Content-Type for JSON responses.
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Content-Type for SSE streams.
    pub const CONTENT_TYPE_SSE: &str = "text/event-stream";

    /// Accept header value for SSE.
    pub const ACCEPT_SSE: &str = "text/event-stream";
}
