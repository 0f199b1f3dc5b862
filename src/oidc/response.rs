//! Response assembly
//!
//! All bytes the provider sends go through this module. Every response
//! carries the no-cache headers; JSON bodies carry `application/json`.
//!
//! Serialization failures are logged and degraded to a bare 500. The HTTP
//! server owns the socket write, so a client that disconnects mid-body only
//! costs that one connection.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::oidc::error::ProtocolError;

/// `Cache-Control` value sent with every response.
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate, max-age=0";

const APPLICATION_JSON: &str = "application/json";

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    error_description: &'a str,
}

/// Sets `Cache-Control` and `Pragma` so no intermediary caches the response.
pub fn no_cache(headers: &mut HeaderMap) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
}

/// Builds a JSON response from already-encoded bytes.
pub fn json_bytes(status: StatusCode, body: Vec<u8>) -> Response {
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    no_cache(headers);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(APPLICATION_JSON),
    );
    response
}

/// Serializes `body` as a 200 JSON response.
pub fn json<T: Serialize>(body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => json_bytes(StatusCode::OK, bytes),
        Err(e) => ProtocolError::internal(e.to_string()).into_response(),
    }
}

/// Builds the JSON error response for `err`.
pub fn error(err: &ProtocolError) -> Response {
    let body = ErrorBody {
        error: err.kind.as_str(),
        error_description: &err.description,
    };
    match serde_json::to_vec(&body) {
        Ok(bytes) => json_bytes(err.status, bytes),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode error response");
            let mut response =
                (StatusCode::INTERNAL_SERVER_ERROR, err.kind.as_str()).into_response();
            no_cache(response.headers_mut());
            response
        }
    }
}

/// Builds a 302 redirect to `location`, an absolute URL or a relative
/// reference.
pub fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            let headers = response.headers_mut();
            no_cache(headers);
            headers.insert(header::LOCATION, value);
            response
        }
        Err(e) => ProtocolError::internal(e.to_string()).into_response(),
    }
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(kind = %self.kind, status = %self.status, "{}", self.description);
        } else {
            tracing::warn!(kind = %self.kind, status = %self.status, "{}", self.description);
        }
        error(&self)
    }
}
