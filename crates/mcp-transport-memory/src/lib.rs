//! In-process transport for the MCP session engine.
//!
//! Provides a connected pair of [`Transport`](mcp_transport_traits::Transport)
//! implementations backed by `tokio::sync::mpsc` channels, with no wire
//! framing involved. Used to wire a client session and a server session
//! together within the same process, and by tests that want to exercise
//! the session engine without a real transport.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![deny(unsafe_code)]

mod transport;

pub use transport::{MemoryTransport, memory_transport_pair};
