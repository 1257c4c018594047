//! Configuration for the streamable HTTP transport.

use std::time::Duration;

/// Protocol version advertised via `Mcp-Protocol-Version` when the caller
/// configures none explicitly.
///
/// Kept as a local literal rather than a dependency on `mcp-protocol`: transport
/// crates in this workspace stay protocol-agnostic, the same way the stdio
/// transport never references `mcp-protocol` either.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// Configuration shared by the HTTP server and client transports.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Path the MCP endpoint is served on (server) or posted to (client).
    ///
    /// Default: `/mcp`.
    pub endpoint_path: String,

    /// Maximum number of concurrent sessions the server-side session manager
    /// will admit. Exceeding this returns HTTP 503 with `Retry-After: 60`.
    ///
    /// Default: 10,000.
    pub max_sessions: usize,

    /// Maximum number of buffered events retained per session for
    /// `Last-Event-ID` replay.
    ///
    /// Default: 1,000.
    pub replay_buffer_size: usize,

    /// Idle timeout after which a session with no activity is eligible for
    /// cleanup.
    ///
    /// Default: 30 minutes.
    pub session_idle_timeout: Duration,

    /// SSE keep-alive comment interval.
    ///
    /// Default: 15 seconds.
    pub keepalive_interval: Duration,

    /// Maximum accepted request body size in bytes.
    ///
    /// Default: 4 MiB.
    pub max_body_size: usize,

    /// Whether the client transport opens a standing `GET` SSE stream for
    /// server-initiated messages, versus relying solely on per-request
    /// response bodies.
    ///
    /// Default: true.
    pub streaming: bool,

    /// Protocol version value sent in `Mcp-Protocol-Version`.
    pub protocol_version: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/mcp".to_string(),
            max_sessions: 10_000,
            replay_buffer_size: 1_000,
            session_idle_timeout: Duration::from_secs(30 * 60),
            keepalive_interval: Duration::from_secs(15),
            max_body_size: 4 * 1024 * 1024,
            streaming: true,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
        }
    }
}

impl HttpTransportConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint path.
    #[must_use]
    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    /// Set the maximum number of concurrent sessions.
    #[must_use]
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the replay buffer size.
    #[must_use]
    pub fn with_replay_buffer_size(mut self, size: usize) -> Self {
        self.replay_buffer_size = size;
        self
    }

    /// Set whether the client keeps a standing SSE stream open.
    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Set the protocol version string.
    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.endpoint_path, "/mcp");
        assert_eq!(config.max_sessions, 10_000);
        assert!(config.streaming);
        assert_eq!(config.protocol_version, DEFAULT_PROTOCOL_VERSION);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = HttpTransportConfig::new()
            .with_endpoint_path("/api/mcp")
            .with_max_sessions(5)
            .with_streaming(false);

        assert_eq!(config.endpoint_path, "/api/mcp");
        assert_eq!(config.max_sessions, 5);
        assert!(!config.streaming);
    }
}
