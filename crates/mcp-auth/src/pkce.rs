//! PKCE (RFC 7636) code verifier/challenge generation and CSRF `state`.
//!
//! Both use the same unreserved alphabet and the same rejection-sampling
//! trick to stay uniform: reading raw random bytes and mapping them into a
//! 66-character alphabet via modulo would bias the low indices, so bytes
//! at or above the largest multiple of 66 that fits in a byte are
//! discarded and re-drawn.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use ring::digest;
use subtle::ConstantTimeEq;

const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
const VERIFIER_LEN: usize = 128;
const STATE_BYTES: usize = 32;

/// The only challenge method this client ever offers or accepts.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

fn random_unreserved_string(len: usize) -> String {
    let mut rng = rand::rng();
    let threshold = 256 - (256 % UNRESERVED.len());
    let mut out = Vec::with_capacity(len);
    let mut buf = [0u8; 1];
    while out.len() < len {
        rng.fill_bytes(&mut buf);
        let byte = buf[0] as usize;
        if byte >= threshold {
            continue;
        }
        out.push(UNRESERVED[byte % UNRESERVED.len()]);
    }
    String::from_utf8(out).expect("unreserved alphabet is ASCII")
}

/// A freshly generated PKCE verifier/challenge pair.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    /// Generate a new 128-character verifier and its S256 challenge.
    #[must_use]
    pub fn generate() -> Self {
        let verifier = random_unreserved_string(VERIFIER_LEN);
        let challenge = challenge_for(&verifier);
        Self { verifier, challenge }
    }
}

/// Derive the S256 challenge for a given verifier: `base64url(SHA-256(verifier))`, unpadded.
#[must_use]
pub fn challenge_for(verifier: &str) -> String {
    let digest = digest::digest(&digest::SHA256, verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest.as_ref())
}

/// Whether the authorization server's advertised challenge methods include
/// `S256`. Absence of the field (not just an empty list) means
/// unsupported — this client does not assume S256 by default.
#[must_use]
pub fn server_supports_s256(code_challenge_methods_supported: Option<&[String]>) -> bool {
    code_challenge_methods_supported.is_some_and(|methods| methods.iter().any(|m| m == CODE_CHALLENGE_METHOD))
}

/// Generate a CSRF `state` value: 32 random bytes, base64url, unpadded.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Constant-time equality check for `state` verification. Unlike `==`,
/// this never short-circuits on the first differing byte.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_is_128_chars_from_unreserved_alphabet() {
        let pkce = Pkce::generate();
        assert_eq!(pkce.verifier.len(), VERIFIER_LEN);
        assert!(pkce.verifier.bytes().all(|b| UNRESERVED.contains(&b)));
    }

    #[test]
    fn challenge_is_deterministic_for_a_given_verifier() {
        let challenge_a = challenge_for("abc");
        let challenge_b = challenge_for("abc");
        assert_eq!(challenge_a, challenge_b);
        assert!(!challenge_a.contains('='));
    }

    #[test]
    fn s256_support_requires_explicit_advertisement() {
        assert!(!server_supports_s256(None));
        assert!(!server_supports_s256(Some(&["plain".to_string()])));
        assert!(server_supports_s256(Some(&["S256".to_string()])));
    }

    #[test]
    fn state_round_trips_through_constant_time_compare() {
        let state = generate_state();
        assert!(constant_time_eq(&state, &state));
        assert!(!constant_time_eq(&state, "different"));
    }
}
