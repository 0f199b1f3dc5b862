//! Form parameters of an OAuth2 request
//!
//! Endpoints accept parameters from the query string and from an
//! `application/x-www-form-urlencoded` body alike. When a name appears more
//! than once the body wins over the query string, and the first occurrence
//! wins within each source. A missing parameter reads as the empty string.
//! A request carrying a malformed percent-escape is rejected as a whole.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};

use crate::oidc::error::ProtocolError;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Merged request parameters.
///
/// # Examples
///
/// ```
/// use mockoidc::oidc::params::FormParams;
///
/// let params = FormParams::from_pairs(Some("scope=openid&state=a"), b"state=b");
/// assert_eq!(params.get("scope"), "openid");
/// assert_eq!(params.get("state"), "b");
/// assert_eq!(params.get("missing"), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    values: HashMap<String, String>,
}

impl FormParams {
    /// Merges a raw query string with a form body.
    pub fn from_pairs(query: Option<&str>, body: &[u8]) -> Self {
        let mut values = HashMap::new();
        let body_pairs = url::form_urlencoded::parse(body);
        let query_pairs = url::form_urlencoded::parse(query.unwrap_or_default().as_bytes());
        for (name, value) in body_pairs.chain(query_pairs) {
            values
                .entry(name.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { values }
    }

    /// Builds the parameters of a request. The body is only read when the
    /// request declares a url-encoded form content type.
    ///
    /// # Errors
    ///
    /// `internal_server_error` (500) when the query string or the form body
    /// contains a `%` not followed by two hex digits.
    pub fn from_request(
        headers: &HeaderMap,
        query: Option<&str>,
        body: &[u8],
    ) -> Result<Self, ProtocolError> {
        let is_form = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim_start().starts_with(FORM_URLENCODED))
            .unwrap_or(false);
        let body = if is_form { body } else { &[] };

        check_escapes(body)?;
        if let Some(query) = query {
            check_escapes(query.as_bytes())?;
        }
        Ok(Self::from_pairs(query, body))
    }

    /// Value of `name`, or the empty string when absent.
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Non-empty value of `name`.
    pub fn optional(&self, name: &str) -> Option<&str> {
        Some(self.get(name)).filter(|value| !value.is_empty())
    }

    /// Sets `name` unless it already has a non-empty value.
    pub fn set_default(&mut self, name: &str, value: impl Into<String>) {
        if self.optional(name).is_none() {
            self.values.insert(name.to_string(), value.into());
        }
    }
}

/// Fails on the first `%` that does not start a two-digit hex escape.
fn check_escapes(raw: &[u8]) -> Result<(), ProtocolError> {
    for (i, byte) in raw.iter().enumerate() {
        if *byte != b'%' {
            continue;
        }
        let escape = raw.get(i + 1..i + 3).unwrap_or(&raw[i + 1..]);
        if escape.len() < 2 || !escape.iter().all(u8::is_ascii_hexdigit) {
            let end = (i + 3).min(raw.len());
            return Err(ProtocolError::internal(format!(
                "invalid URL escape \"{}\"",
                String::from_utf8_lossy(&raw[i..end])
            )));
        }
    }
    Ok(())
}
