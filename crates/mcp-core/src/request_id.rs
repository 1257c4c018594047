use std::fmt;

use serde::{Deserialize, Serialize};

/// A JSON-RPC request identifier.
///
/// Ids are either a string or a signed integer and must round-trip
/// bit-identically: a request sent with `RequestId::Number(7)` must come
/// back as `7`, never `"7"` or `7.0`. `serde`'s untagged representation
/// gives us that for free since it tries each variant in order and keeps
/// whatever the wire actually sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// A string identifier.
    String(String),
    /// A signed-integer identifier.
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        Self::Number(n as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_number_as_number() {
        let id = RequestId::Number(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn round_trips_string_as_string() {
        let id = RequestId::String("req-1".into());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"req-1\"");
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(RequestId::Number(42).to_string(), "42");
        assert_eq!(RequestId::String("x".into()).to_string(), "x");
    }
}
