//! Request validation primitives
//!
//! Each check returns `Ok(())` or the [`ProtocolError`] the endpoint must
//! answer with; callers chain them with `?` so the first violation ends the
//! request.

use axum::http::StatusCode;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::oidc::error::{ErrorKind, ProtocolError};
use crate::oidc::params::FormParams;

/// Requires every parameter in `names` to be present and non-empty.
///
/// # Errors
///
/// `invalid_request` (400) naming the first missing parameter.
pub fn require_all(params: &FormParams, names: &[&str]) -> Result<(), ProtocolError> {
    match names.iter().find(|name| params.get(name).is_empty()) {
        Some(name) => Err(ProtocolError::invalid_request(format!(
            "The request is missing the required parameter: {}",
            name
        ))),
        None => Ok(()),
    }
}

/// Requires parameter `name` to equal `expected`.
///
/// The comparison runs in constant time with respect to both the contents
/// and the length of the submitted value.
///
/// # Errors
///
/// A `kind` error with status 401 and description `"{message}: {value}"`.
pub fn require_equal(
    params: &FormParams,
    name: &str,
    expected: &str,
    kind: ErrorKind,
    message: &str,
) -> Result<(), ProtocolError> {
    let value = params.get(name);
    if constant_time_eq(expected, value) {
        Ok(())
    } else {
        Err(ProtocolError::new(
            kind,
            format!("{}: {}", message, value),
            StatusCode::UNAUTHORIZED,
        ))
    }
}

/// Requires every requested scope to appear in `supported`.
///
/// # Errors
///
/// `invalid_scope` (400) naming the first unsupported scope.
pub fn require_scope_subset(requested: &[String], supported: &[&str]) -> Result<(), ProtocolError> {
    match requested
        .iter()
        .find(|scope| !supported.contains(&scope.as_str()))
    {
        Some(scope) => Err(ProtocolError::invalid_scope(format!(
            "Unsupported scope: {}",
            scope
        ))),
        None => Ok(()),
    }
}

/// Compares two strings without leaking where or whether their lengths
/// differ.
///
/// Both sides are reduced to fixed-size SHA-256 digests first, so the final
/// comparison always covers 32 bytes.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    a.as_slice().ct_eq(b.as_slice()).into()
}
