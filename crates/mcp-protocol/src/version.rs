use serde::{Deserialize, Serialize};

/// The version substituted for a missing `protocolVersion` field on an
/// `initialize` request, per the documented handshake default.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// A protocol version, a `YYYY-MM-DD` date string.
///
/// Lexicographic ordering on the underlying string matches chronological
/// ordering, so `SupportedVersions` can compare versions directly without
/// parsing them as dates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(String);

impl ProtocolVersion {
    /// Wrap a raw `YYYY-MM-DD` string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying date string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProtocolVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::new(DEFAULT_PROTOCOL_VERSION)
    }
}

/// An ordered, latest-first list of versions one side supports.
///
/// The head of the list is that side's preferred version, used both as the
/// default when a peer omits `protocolVersion` and as the fallback when no
/// version in the peer's list is mutually supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedVersions {
    versions: Vec<ProtocolVersion>,
}

impl SupportedVersions {
    /// Build from a latest-first list. Panics if `versions` is empty — a
    /// side with no supported versions cannot negotiate anything.
    pub fn new(versions: Vec<ProtocolVersion>) -> Self {
        assert!(!versions.is_empty(), "must support at least one protocol version");
        Self { versions }
    }

    /// The preferred (head) version.
    #[must_use]
    pub fn preferred(&self) -> &ProtocolVersion {
        &self.versions[0]
    }

    /// Whether `version` is in this list.
    #[must_use]
    pub fn supports(&self, version: &ProtocolVersion) -> bool {
        self.versions.contains(version)
    }

    /// Server-side negotiation per the handshake ordering rule: if the
    /// client's preferred version is in the server's supported list,
    /// return it; else return the server's preferred version.
    #[must_use]
    pub fn negotiate_as_server(&self, client_preferred: &ProtocolVersion) -> ProtocolVersion {
        if self.supports(client_preferred) {
            client_preferred.clone()
        } else {
            self.preferred().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_versions() -> SupportedVersions {
        SupportedVersions::new(vec![
            ProtocolVersion::new("2025-06-18"),
            ProtocolVersion::new("2025-03-26"),
            ProtocolVersion::new("2024-11-05"),
        ])
    }

    #[test]
    fn negotiates_client_preferred_when_supported() {
        let server = server_versions();
        let negotiated = server.negotiate_as_server(&ProtocolVersion::new("2025-03-26"));
        assert_eq!(negotiated, ProtocolVersion::new("2025-03-26"));
    }

    #[test]
    fn falls_back_to_server_preferred_when_unsupported() {
        let server = server_versions();
        let negotiated = server.negotiate_as_server(&ProtocolVersion::new("2099-01-01"));
        assert_eq!(negotiated, ProtocolVersion::new("2025-06-18"));
    }

    #[test]
    fn lexicographic_order_matches_chronological() {
        let mut versions = vec![
            ProtocolVersion::new("2024-11-05"),
            ProtocolVersion::new("2025-06-18"),
            ProtocolVersion::new("2025-03-26"),
        ];
        versions.sort();
        assert_eq!(
            versions,
            vec![
                ProtocolVersion::new("2024-11-05"),
                ProtocolVersion::new("2025-03-26"),
                ProtocolVersion::new("2025-06-18"),
            ]
        );
    }
}
