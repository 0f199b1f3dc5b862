//! OpenID Connect Discovery and key publication
//!
//! Serves the provider metadata document at
//! `/oidc/.well-known/openid-configuration` and the JWKS at
//! `/oidc/.well-known/jwks.json`. Every URL in the document is derived from
//! the provider's base URL, so the document stays correct wherever the
//! server is reachable.
//!
//! # References
//!
//! - OpenID Connect Discovery 1.0 <https://openid.net/specs/openid-connect-discovery-1_0.html>
//! - RFC 7517 (JSON Web Key) <https://www.rfc-editor.org/rfc/rfc7517>

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::oidc::error::{internal_error, ProtocolError};
use crate::oidc::{
    response, Provider, ProviderSettings, AUTHORIZATION_ENDPOINT, CLAIMS_SUPPORTED,
    GRANT_TYPES_SUPPORTED, ID_TOKEN_SIGNING_ALG_VALUES_SUPPORTED, JWKS_ENDPOINT,
    RESPONSE_TYPES_SUPPORTED, SCOPES_SUPPORTED, SUBJECT_TYPES_SUPPORTED,
    TOKEN_ENDPOINT, TOKEN_ENDPOINT_AUTH_METHODS_SUPPORTED, USERINFO_ENDPOINT,
};

/// Metadata document describing this OpenID provider.
///
/// # Examples
///
/// ```
/// use mockoidc::oidc::discovery::ProviderMetadata;
///
/// let json = r#"{
///     "issuer": "http://127.0.0.1:8080/oidc",
///     "authorization_endpoint": "http://127.0.0.1:8080/oidc/authorize",
///     "token_endpoint": "http://127.0.0.1:8080/oidc/token",
///     "jwks_uri": "http://127.0.0.1:8080/oidc/.well-known/jwks.json",
///     "userinfo_endpoint": "http://127.0.0.1:8080/oidc/userinfo",
///     "grant_types_supported": ["authorization_code"],
///     "response_types_supported": ["code"],
///     "subject_types_supported": ["public"],
///     "id_token_signing_alg_values_supported": ["RS256"],
///     "scopes_supported": ["openid"],
///     "token_endpoint_auth_methods_supported": ["client_secret_basic"],
///     "claims_supported": ["sub"]
/// }"#;
///
/// let meta: ProviderMetadata = serde_json::from_str(json).unwrap();
/// assert_eq!(meta.issuer, "http://127.0.0.1:8080/oidc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// The issuer identifier, `base_url` + `/oidc`.
    pub issuer: String,

    pub authorization_endpoint: String,

    pub token_endpoint: String,

    /// URL of the JSON Web Key Set used to verify issued tokens.
    pub jwks_uri: String,

    pub userinfo_endpoint: String,

    pub grant_types_supported: Vec<String>,

    pub response_types_supported: Vec<String>,

    pub subject_types_supported: Vec<String>,

    pub id_token_signing_alg_values_supported: Vec<String>,

    pub scopes_supported: Vec<String>,

    pub token_endpoint_auth_methods_supported: Vec<String>,

    /// Claims that may appear in ID tokens and userinfo responses.
    pub claims_supported: Vec<String>,
}

impl ProviderMetadata {
    /// Builds the document for a provider reachable at
    /// `settings.base_url`.
    pub fn for_settings(settings: &ProviderSettings) -> Self {
        Self {
            issuer: settings.issuer(),
            authorization_endpoint: settings.endpoint_url(AUTHORIZATION_ENDPOINT),
            token_endpoint: settings.endpoint_url(TOKEN_ENDPOINT),
            jwks_uri: settings.endpoint_url(JWKS_ENDPOINT),
            userinfo_endpoint: settings.endpoint_url(USERINFO_ENDPOINT),
            grant_types_supported: to_strings(GRANT_TYPES_SUPPORTED),
            response_types_supported: to_strings(RESPONSE_TYPES_SUPPORTED),
            subject_types_supported: to_strings(SUBJECT_TYPES_SUPPORTED),
            id_token_signing_alg_values_supported: to_strings(
                ID_TOKEN_SIGNING_ALG_VALUES_SUPPORTED,
            ),
            scopes_supported: to_strings(SCOPES_SUPPORTED),
            token_endpoint_auth_methods_supported: to_strings(
                TOKEN_ENDPOINT_AUTH_METHODS_SUPPORTED,
            ),
            claims_supported: to_strings(CLAIMS_SUPPORTED),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// `GET /oidc/.well-known/openid-configuration`
pub async fn discovery(State(provider): State<Arc<Provider>>) -> Response {
    response::json(&ProviderMetadata::for_settings(provider.settings()))
}

/// `GET /oidc/.well-known/jwks.json`
pub async fn jwks(State(provider): State<Arc<Provider>>) -> Result<Response, ProtocolError> {
    let body = provider.keys.public_keys().map_err(internal_error)?;
    Ok(response::json_bytes(StatusCode::OK, body))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_metadata_urls_follow_base_url() {
        let settings = ProviderSettings {
            base_url: "https://idp.test:8443".to_string(),
            client_id: "c".to_string(),
            client_secret: "s".to_string(),
            access_ttl: Duration::minutes(10),
            refresh_ttl: Duration::hours(1),
        };
        let meta = ProviderMetadata::for_settings(&settings);
        assert_eq!(meta.issuer, "https://idp.test:8443/oidc");
        assert_eq!(meta.authorization_endpoint, "https://idp.test:8443/oidc/authorize");
        assert_eq!(meta.token_endpoint, "https://idp.test:8443/oidc/token");
        assert_eq!(meta.userinfo_endpoint, "https://idp.test:8443/oidc/userinfo");
        assert_eq!(
            meta.jwks_uri,
            "https://idp.test:8443/oidc/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_metadata_capabilities() {
        let settings = ProviderSettings {
            base_url: "http://localhost".to_string(),
            client_id: "c".to_string(),
            client_secret: "s".to_string(),
            access_ttl: Duration::minutes(10),
            refresh_ttl: Duration::hours(1),
        };
        let json = serde_json::to_value(ProviderMetadata::for_settings(&settings)).unwrap();
        assert_eq!(
            json["grant_types_supported"],
            serde_json::json!(["authorization_code", "refresh_token"])
        );
        assert_eq!(json["response_types_supported"], serde_json::json!(["code"]));
        assert_eq!(
            json["id_token_signing_alg_values_supported"],
            serde_json::json!(["RS256"])
        );
        assert_eq!(
            json["scopes_supported"],
            serde_json::json!(["openid", "email", "groups", "profile"])
        );
        assert_eq!(
            json["token_endpoint_auth_methods_supported"],
            serde_json::json!(["client_secret_basic", "client_secret_post"])
        );
        assert_eq!(json["claims_supported"].as_array().unwrap().len(), 9);
    }
}
