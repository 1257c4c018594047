//! Core error type and request identifier shared by every crate in the MCP
//! session engine.
//!
//! Keeping these two small, dependency-light types in their own crate lets
//! the wire codec, the session engine, and the auth subsystem all agree on
//! "what is an error" and "what is a request id" without pulling in any of
//! the heavier transport or OAuth machinery.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![deny(unsafe_code)]

mod error;
mod request_id;

pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use request_id::RequestId;
