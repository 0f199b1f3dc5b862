//! Error types for mockoidc
//!
//! This module defines the crate-level error type used by configuration
//! loading, the collaborator implementations (keys, sessions) and server
//! bootstrapping, using `thiserror` for ergonomic error handling.
//!
//! Protocol errors that are surfaced to OAuth2/OIDC clients live in
//! [`crate::oidc::error`]; they carry an HTTP status and a closed error kind
//! and are kept separate from the failures defined here.

use thiserror::Error;

/// Main error type for mockoidc operations
///
/// These errors never reach a client verbatim as a protocol error kind. When
/// one surfaces inside a request it is reported as `internal_server_error`
/// with the error text as the description.
#[derive(Error, Debug)]
pub enum MockOidcError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key material could not be generated, loaded or used
    #[error("Key authority error: {0}")]
    KeyAuthority(String),

    /// No session is registered under the given identifier
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The session's authorization code has already been redeemed
    #[error("Session already granted: {0}")]
    SessionAlreadyGranted(String),

    /// Server bootstrapping errors (bind, serve)
    #[error("Server error: {0}")]
    Server(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Token signing or verification errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Result type alias for mockoidc operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = MockOidcError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_key_authority_error_display() {
        let error = MockOidcError::KeyAuthority("bad pem".to_string());
        assert_eq!(error.to_string(), "Key authority error: bad pem");
    }

    #[test]
    fn test_session_errors_display() {
        let error = MockOidcError::SessionNotFound("abc".to_string());
        assert_eq!(error.to_string(), "Session not found: abc");

        let error = MockOidcError::SessionAlreadyGranted("abc".to_string());
        assert_eq!(error.to_string(), "Session already granted: abc");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let error: MockOidcError = io_error.into();
        assert!(matches!(error, MockOidcError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: MockOidcError = json_error.into();
        assert!(matches!(error, MockOidcError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: MockOidcError = yaml_error.into();
        assert!(matches!(error, MockOidcError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockOidcError>();
    }
}
