//! OAuth 2.1 client providers and resource-server middleware for the MCP
//! session engine.
//!
//! The client side ([`providers`]) discovers an MCP server's protected
//! resource and authorization server metadata (RFC 9728, RFC 8414),
//! registers a client (RFC 7591, or a Client ID Metadata Document per
//! SEP-991), and runs one of three grants behind a single
//! [`providers::OAuthClientProvider`] trait. [`http_bridge`] adapts that
//! trait to the HTTP transport's own auth hook so the transport's
//! 401/403 retry logic can drive it directly.
//!
//! The server side ([`resource_server`]) validates bearer tokens against
//! a user-supplied [`resource_server::TokenVerifier`] and serves this
//! server's own protected-resource metadata document.

pub mod cimd;
pub mod client_auth;
pub mod dcr;
pub mod discovery;
pub mod endpoint_safety;
pub mod http_bridge;
pub mod pkce;
pub mod providers;
pub mod refresh;
pub mod resource;
pub mod resource_server;
pub mod token;
pub mod www_authenticate;

pub use http_bridge::OAuthHttpBridge;
pub use providers::{OAuthClientProvider, TokenStorage, UnauthorizedContext};
pub use providers::{AssertionCallback, AuthorizationCodeProvider, AuthorizationRedirect, ClientCredentialsProvider, PrivateKeyJwtProvider, RedirectHandler};
pub use token::TokenSet;
