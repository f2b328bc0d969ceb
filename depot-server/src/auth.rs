//! HTTP Basic authentication header parsing.
//!
//! Basic auth is the only credential transport. A request whose
//! `Authorization` header is missing, uses another scheme, or cannot be decoded
//! is treated as carrying no credentials at all.

use std::fmt;

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Username and password supplied with a request
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Extract credentials from the `Authorization` header, if present and well-formed.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        Self::parse(value)
    }

    /// Parse a `Basic <base64(user:password)>` header value.
    ///
    /// The scheme is matched case-insensitively and the password may contain `:`.
    pub fn parse(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::new(username, password))
    }

    /// Header value for these credentials, as a client would send it.
    pub fn to_header_value(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_round_trip_header() {
        let creds = BasicCredentials::new("alice", "secret");
        let parsed = BasicCredentials::parse(&creds.to_header_value()).unwrap();
        assert_eq!(parsed, creds);
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        // "bob:topsecret"
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic Ym9iOnRvcHNlY3JldA=="),
        );

        let creds = BasicCredentials::from_headers(&headers).unwrap();
        assert_eq!(creds.username, "bob");
        assert_eq!(creds.password, "topsecret");
    }

    #[test]
    fn test_missing_header() {
        assert!(BasicCredentials::from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let value = BasicCredentials::new("alice", "secret")
            .to_header_value()
            .replace("Basic", "bAsIc");
        assert!(BasicCredentials::parse(&value).is_some());
    }

    #[test]
    fn test_password_may_contain_colon() {
        let creds = BasicCredentials::parse(&format!("Basic {}", STANDARD.encode("carol:p:w")))
            .unwrap();
        assert_eq!(creds.username, "carol");
        assert_eq!(creds.password, "p:w");
    }

    #[test]
    fn test_malformed_headers() {
        assert!(BasicCredentials::parse("Bearer abc").is_none());
        assert!(BasicCredentials::parse("Basic").is_none());
        assert!(BasicCredentials::parse("Basic !!!not-base64!!!").is_none());
        // "nocolon"
        assert!(BasicCredentials::parse("Basic bm9jb2xvbg==").is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", BasicCredentials::new("alice", "secret"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("secret"));
    }
}
