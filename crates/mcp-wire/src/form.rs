use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters RFC 3986 marks unreserved: everything except ASCII
/// alphanumerics and `-`, `.`, `_`, `~`. Everything else, including space
/// and `*`, is percent-encoded.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Encode key/value pairs as an `application/x-www-form-urlencoded` body.
///
/// Keys are sorted before encoding so that OAuth token and registration
/// requests produce a deterministic body regardless of call-site map
/// iteration order — this matters for request logging and for tests that
/// assert on the literal body.
pub fn encode_form<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let sorted: BTreeMap<&str, &str> = params.into_iter().collect();
    sorted
        .into_iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, FORM_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_keys_and_escapes_spaces() {
        let body = encode_form([("grant_type", "authorization_code"), ("code", "a b"), ("client_id", "x y")]);
        assert_eq!(body, "client_id=x%20y&code=a%20b&grant_type=authorization_code");
    }

    #[test]
    fn escapes_reserved_characters() {
        let body = encode_form([("redirect_uri", "https://a.example/cb?x=1")]);
        assert_eq!(body, "redirect_uri=https%3A%2F%2Fa.example%2Fcb%3Fx%3D1");
    }

    #[test]
    fn leaves_unreserved_characters_unescaped() {
        let body = encode_form([("k", "a-Z_0.9~")]);
        assert_eq!(body, "k=a-Z_0.9~");
    }

    #[test]
    fn escapes_asterisk() {
        let body = encode_form([("k", "a*b")]);
        assert_eq!(body, "k=a%2Ab");
    }
}
