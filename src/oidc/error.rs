//! OAuth2 protocol errors
//!
//! Every rejected request is described by a [`ProtocolError`]: a kind from a
//! closed set, a human-readable description and the HTTP status to answer
//! with. The wire form is `{"error": <kind>, "error_description": <text>}`,
//! produced by [`crate::oidc::response`].

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The `error` values this provider emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnsupportedGrantType,
    InvalidScope,
    InternalServerError,
}

impl ErrorKind {
    /// The wire value of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::InternalServerError => "internal_server_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected request: kind, description and HTTP status.
///
/// # Examples
///
/// ```
/// use axum::http::StatusCode;
/// use mockoidc::oidc::error::{ErrorKind, ProtocolError};
///
/// let err = ProtocolError::invalid_scope("Unsupported scope: unknown");
/// assert_eq!(err.kind, ErrorKind::InvalidScope);
/// assert_eq!(err.status, StatusCode::BAD_REQUEST);
/// assert_eq!(err.to_string(), "invalid_scope: Unsupported scope: unknown");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {description}")]
pub struct ProtocolError {
    pub kind: ErrorKind,
    pub description: String,
    pub status: StatusCode,
}

impl ProtocolError {
    /// Creates an error with an explicit status.
    pub fn new(kind: ErrorKind, description: impl Into<String>, status: StatusCode) -> Self {
        Self {
            kind,
            description: description.into(),
            status,
        }
    }

    /// `invalid_request` with status 400.
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, description, StatusCode::BAD_REQUEST)
    }

    /// `invalid_request` with status 401, used for unusable bearer tokens.
    pub fn unauthorized(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, description, StatusCode::UNAUTHORIZED)
    }

    /// `invalid_grant` with status 401.
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGrant, description, StatusCode::UNAUTHORIZED)
    }

    /// `invalid_scope` with status 400.
    pub fn invalid_scope(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidScope, description, StatusCode::BAD_REQUEST)
    }

    /// `internal_server_error` with status 500. The description is passed
    /// through to the client unchanged.
    pub fn internal(description: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::InternalServerError,
            description,
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    }
}

/// Maps a collaborator failure to `internal_server_error`.
pub(crate) fn internal_error(err: anyhow::Error) -> ProtocolError {
    ProtocolError::internal(err.to_string())
}
