//! Bearer token authorization
//!
//! Verifies tokens presented in an `Authorization: Bearer` header or passed
//! directly (refresh tokens). A token is usable when its signature verifies
//! with the provider's keys and its `exp` claim has not passed according to
//! the provider's clock.
//!
//! Unusable tokens are reported as `invalid_request` with status 401.

use axum::http::{header, HeaderMap};
use serde_json::{Map, Value};

use crate::oidc::error::ProtocolError;
use crate::oidc::Provider;

/// A token whose signature and expiry have been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub raw: String,
    pub claims: Map<String, Value>,
}

impl Provider {
    /// Verifies the bearer token in the `Authorization` header.
    ///
    /// # Errors
    ///
    /// `invalid_request` (401) when the header is missing or not of the form
    /// `Bearer <token>`, plus everything [`Provider::authorize_token`]
    /// returns.
    pub fn authorize_bearer(&self, headers: &HeaderMap) -> Result<VerifiedToken, ProtocolError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        match value.split_once(' ') {
            Some(("Bearer", token)) => self.authorize_token(token),
            _ => Err(ProtocolError::unauthorized("Invalid authorization header")),
        }
    }

    /// Verifies a raw token string.
    ///
    /// # Errors
    ///
    /// - `invalid_request` (401) when the signature does not verify, with the
    ///   verification error in the description.
    /// - `internal_server_error` (500) when the claims are not a JSON object
    ///   or carry no numeric `exp`.
    /// - `invalid_request` (401) when `exp` lies in the past.
    pub fn authorize_token(&self, token: &str) -> Result<VerifiedToken, ProtocolError> {
        let claims = self
            .keys
            .verify(token)
            .map_err(|e| ProtocolError::unauthorized(format!("Invalid token: {}", e)))?;

        let Value::Object(claims) = claims else {
            return Err(ProtocolError::internal("Unable to extract token claims"));
        };

        let exp = claims
            .get("exp")
            .and_then(Value::as_f64)
            .ok_or_else(|| ProtocolError::internal("Unable to extract token expiration"))?;

        if self.clock.now().timestamp() > exp as i64 {
            return Err(ProtocolError::unauthorized("The token is expired"));
        }

        Ok(VerifiedToken {
            raw: token.to_string(),
            claims,
        })
    }
}
