use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mcp_core::{Error, ErrorKind};

/// Base64url-encode (no padding), per RFC 7636/RFC 4648 §5.
pub fn encode(input: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Base64url-decode (no padding).
///
/// # Errors
/// Returns [`ErrorKind::Parse`] if `input` is not valid base64url.
pub fn decode(input: impl AsRef<[u8]>) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|e| Error::new(ErrorKind::Parse, format!("invalid base64url: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let original = b"hello world, this has / and + unsafe chars in base64std";
        let encoded = encode(original);
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='));
        assert_eq!(decode(&encoded).unwrap(), original);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(decode("not valid base64url!!!").is_err());
    }
}
