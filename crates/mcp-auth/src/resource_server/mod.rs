//! OAuth resource-server middleware: validates bearer tokens on inbound
//! requests and serves the `oauth-protected-resource` well-known
//! document.

mod middleware;
mod prm_endpoint;

pub use middleware::{AuthInfo, AuthResult, HttpResponse, ResourceServerConfig, TokenVerifier, authenticate_request, forbidden_response};
pub use prm_endpoint::serve_protected_resource_metadata;
