//! RFC 9110 §11.6.1 `WWW-Authenticate` header parsing.
//!
//! A header value can carry multiple comma-separated challenges, each
//! either a bare scheme, a scheme with a `token68` credential, or a scheme
//! followed by `key=value` parameters (quoted or bare). The parser is
//! total: every iteration of its main loop advances the cursor by at
//! least one character, so malformed input terminates rather than
//! looping forever — it just produces fewer or emptier challenges.

use std::collections::HashMap;

/// One challenge parsed out of a `WWW-Authenticate` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub scheme: String,
    pub params: HashMap<String, String>,
}

impl Challenge {
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn resource_metadata(&self) -> Option<&str> {
        self.param("resource_metadata")
    }

    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.param("scope")
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.param("error")
    }

    #[must_use]
    pub fn error_description(&self) -> Option<&str> {
        self.param("error_description")
    }
}

/// Parse every challenge out of a `WWW-Authenticate` header value.
#[must_use]
pub fn parse(header: &str) -> Vec<Challenge> {
    let mut challenges = Vec::new();
    let bytes = header.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        skip_ws_and_commas(bytes, &mut pos);
        if pos >= bytes.len() {
            break;
        }

        let scheme_start = pos;
        while pos < bytes.len() && is_token_char(bytes[pos]) {
            pos += 1;
        }
        if pos == scheme_start {
            // Not a token character where a scheme was expected; skip it
            // to guarantee forward progress.
            pos += 1;
            continue;
        }
        let scheme = header[scheme_start..pos].to_string();

        skip_ws(bytes, &mut pos);

        let mut params = HashMap::new();
        if pos < bytes.len() && is_token68_start(bytes, pos) && !peeks_like_key_value(bytes, pos) {
            // token68 credential: consume it but it carries no named
            // parameters we expose.
            while pos < bytes.len() && (is_token68_char(bytes[pos]) || bytes[pos] == b'=') {
                pos += 1;
            }
        } else {
            parse_params(header, bytes, &mut pos, &mut params);
        }

        challenges.push(Challenge { scheme, params });
    }

    challenges
}

/// Find the first `Bearer` challenge among all parsed challenges,
/// case-insensitively, scanning the full set rather than stopping at the
/// first entry.
#[must_use]
pub fn find_bearer(header: &str) -> Option<Challenge> {
    parse(header).into_iter().find(|c| c.scheme.eq_ignore_ascii_case("bearer"))
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~')
}

fn is_token68_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'+' | b'/')
}

fn is_token68_start(bytes: &[u8], pos: usize) -> bool {
    pos < bytes.len() && is_token68_char(bytes[pos])
}

/// Disambiguate `token68` from `key=value, key2=value2` by checking
/// whether the run of token68 characters is immediately followed by `=`
/// and then more content that looks like `token=`.
fn peeks_like_key_value(bytes: &[u8], pos: usize) -> bool {
    let mut i = pos;
    while i < bytes.len() && is_token_char(bytes[i]) {
        i += 1;
    }
    i < bytes.len() && bytes[i] == b'='
}

fn skip_ws(bytes: &[u8], pos: &mut usize) {
    while *pos < bytes.len() && (bytes[*pos] == b' ' || bytes[*pos] == b'\t') {
        *pos += 1;
    }
}

fn skip_ws_and_commas(bytes: &[u8], pos: &mut usize) {
    while *pos < bytes.len() && (bytes[*pos] == b' ' || bytes[*pos] == b'\t' || bytes[*pos] == b',') {
        *pos += 1;
    }
}

fn parse_params(full: &str, bytes: &[u8], pos: &mut usize, params: &mut HashMap<String, String>) {
    loop {
        skip_ws_and_commas(bytes, pos);
        if *pos >= bytes.len() {
            return;
        }

        let key_start = *pos;
        while *pos < bytes.len() && is_token_char(bytes[*pos]) {
            *pos += 1;
        }
        if *pos == key_start {
            // Whatever follows isn't a parameter key; it must be the
            // start of the next challenge's scheme. Back off so the
            // outer loop re-reads it.
            return;
        }
        let key = full[key_start..*pos].to_lowercase();

        skip_ws(bytes, pos);
        if *pos >= bytes.len() || bytes[*pos] != b'=' {
            // A bare token with no `=`: this is actually the next
            // challenge's scheme, not a parameter of this one. Rewind.
            *pos = key_start;
            return;
        }
        *pos += 1;
        skip_ws(bytes, pos);

        let value = if *pos < bytes.len() && bytes[*pos] == b'"' {
            parse_quoted_string(full, bytes, pos)
        } else {
            let value_start = *pos;
            while *pos < bytes.len() && bytes[*pos] != b',' && bytes[*pos] != b' ' {
                *pos += 1;
            }
            full[value_start..*pos].to_string()
        };

        params.insert(key, value);
        skip_ws(bytes, pos);
        if *pos < bytes.len() && bytes[*pos] == b',' {
            // Look ahead: if what follows the comma has no `=`, it's the
            // next challenge's scheme, not another parameter.
            let mut lookahead = *pos + 1;
            skip_ws_and_commas(bytes, &mut lookahead);
            if !peeks_like_key_value(bytes, lookahead) {
                return;
            }
        } else {
            return;
        }
    }
}

fn parse_quoted_string(full: &str, bytes: &[u8], pos: &mut usize) -> String {
    debug_assert_eq!(bytes[*pos], b'"');
    *pos += 1;
    let mut out = String::new();
    while *pos < bytes.len() {
        match bytes[*pos] {
            b'\\' if *pos + 1 < bytes.len() => {
                out.push(full[*pos + 1..*pos + 2].chars().next().unwrap_or('\\'));
                *pos += 2;
            }
            b'"' => {
                *pos += 1;
                break;
            }
            _ => {
                out.push(bytes[*pos] as char);
                *pos += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_bearer_challenge_with_quoted_params() {
        let header = r#"Bearer realm="example", error="invalid_token", error_description="the token expired""#;
        let challenges = parse(header);
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].scheme, "Bearer");
        assert_eq!(challenges[0].error(), Some("invalid_token"));
        assert_eq!(challenges[0].error_description(), Some("the token expired"));
    }

    #[test]
    fn finds_bearer_among_multiple_challenges() {
        let header = r#"Basic realm="x", Bearer realm="y", scope="a b""#;
        let bearer = find_bearer(header).unwrap();
        assert_eq!(bearer.scope(), Some("a b"));
    }

    #[test]
    fn handles_backslash_escapes_in_quoted_strings() {
        let header = r#"Bearer error_description="has \"quotes\" inside""#;
        let challenges = parse(header);
        assert_eq!(challenges[0].error_description(), Some("has \"quotes\" inside"));
    }

    #[test]
    fn resource_metadata_param_is_accessible() {
        let header = r#"Bearer resource_metadata="https://example.com/.well-known/oauth-protected-resource""#;
        let challenges = parse(header);
        assert_eq!(
            challenges[0].resource_metadata(),
            Some("https://example.com/.well-known/oauth-protected-resource")
        );
    }

    #[test]
    fn parser_terminates_on_malformed_input() {
        let header = ",,,===bad===,,,Bearer realm=\"ok\"";
        let challenges = parse(header);
        assert!(challenges.iter().any(|c| c.scheme.eq_ignore_ascii_case("bearer")));
    }

    #[test]
    fn bare_scheme_with_no_params() {
        let challenges = parse("Negotiate");
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].scheme, "Negotiate");
        assert!(challenges[0].params.is_empty());
    }
}
