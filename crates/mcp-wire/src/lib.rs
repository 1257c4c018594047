//! JSON-RPC 2.0 wire codec for the MCP session engine.
//!
//! This crate owns exactly the bytes-in, bytes-out boundary: encoding and
//! decoding JSON-RPC messages, recovering a request id from a payload that
//! failed full decoding, and the small encoding helpers (form bodies,
//! base64url) the OAuth layer needs but that have nothing to do with OAuth
//! itself.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![deny(unsafe_code)]

mod base64url;
mod codec;
mod form;
mod message;

pub use base64url::{decode as base64url_decode, encode as base64url_encode};
pub use codec::{decode, encode, extract_id};
pub use form::encode_form;
pub use message::{JsonRpcError, Message, Notification, Request, Response, ResponsePayload};
