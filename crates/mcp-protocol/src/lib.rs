//! Protocol version negotiation, capability negotiation, and the
//! `initialize` handshake types for the MCP session engine.
//!
//! This crate is deliberately narrow: it covers only the handshake and the
//! cross-cutting notification names the session engine needs to know about
//! (`progress`, `cancelled`, `initialized`, `*ListChanged`). Tool/prompt/
//! resource method semantics are out of scope for the core.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![deny(unsafe_code)]

mod capabilities;
mod initialize;
mod methods;
mod version;

pub use capabilities::{
    ClientCapabilities, ElicitationCapability, ListChangedCapability, LoggingCapability, RegisteredClientHandlers,
    RegisteredServerHandlers, ResourcesCapability, SamplingCapability, ServerCapabilities, merge_client_capabilities,
    merge_server_capabilities,
};
pub use initialize::{Implementation, InitializeRequest, InitializeResult, InitializedNotification};
pub use methods::{CANCELLED, INITIALIZE, INITIALIZED, LOGGING_MESSAGE, PING, PROGRESS, is_list_changed_method};
pub use version::{DEFAULT_PROTOCOL_VERSION, ProtocolVersion, SupportedVersions};
