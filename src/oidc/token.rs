//! Token endpoint
//!
//! Exchanges an authorization code or a refresh token for a token set.
//! Client credentials may arrive in the form body (`client_secret_post`) or
//! in an HTTP Basic `Authorization` header (`client_secret_basic`); form
//! values take precedence.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::oidc::error::{internal_error, ErrorKind, ProtocolError};
use crate::oidc::params::FormParams;
use crate::oidc::validate::{require_all, require_equal};
use crate::oidc::{response, Provider, OPENID_SCOPE};
use crate::session::Session;

/// `token_type` of every issued access token.
pub const TOKEN_TYPE_BEARER: &str = "bearer";

/// Supported `grant_type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl FromStr for GrantType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "refresh_token" => Ok(Self::RefreshToken),
            other => Err(ProtocolError::invalid_request(format!(
                "Invalid grant type: {}",
                other
            ))),
        }
    }
}

/// Successful token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Present only when the first requested scope was `openid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    pub refresh_token: String,

    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// `POST /oidc/token`
pub async fn token(
    State(provider): State<Arc<Provider>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ProtocolError> {
    let mut params = FormParams::from_request(&headers, query.as_deref(), &body)?;
    if let Some((client_id, client_secret)) = basic_credentials(&headers) {
        params.set_default("client_id", client_id);
        params.set_default("client_secret", client_secret);
    }
    let tokens = provider.token(&params).await?;
    Ok(response::json(&tokens))
}

impl Provider {
    /// Runs a token request.
    ///
    /// # Errors
    ///
    /// - `invalid_request` (400) for a missing parameter or an unknown grant
    ///   type
    /// - `invalid_client` (401) for a wrong client id or secret
    /// - `unsupported_grant_type` (401) when the grant's parameters do not
    ///   match its `grant_type`
    /// - `invalid_grant` (401) for an unknown or already redeemed code, or a
    ///   refresh token whose session is gone
    /// - bearer errors (401/500) for an unusable refresh token
    pub async fn token(&self, params: &FormParams) -> Result<TokenResponse, ProtocolError> {
        self.validate_client(params)?;

        let grant: GrantType = params.get("grant_type").parse()?;
        let session = match grant {
            GrantType::AuthorizationCode => self.validate_code_grant(params).await?,
            GrantType::RefreshToken => self.validate_refresh_grant(params).await?,
        };

        let tokens = self.issue_tokens(&session, grant, params.get("refresh_token"))?;
        tracing::info!(
            session_id = %session.id,
            grant_type = grant.as_str(),
            id_token = tokens.id_token.is_some(),
            "Tokens issued"
        );
        Ok(tokens)
    }

    fn validate_client(&self, params: &FormParams) -> Result<(), ProtocolError> {
        require_all(params, &["client_id", "client_secret", "grant_type"])?;
        require_equal(
            params,
            "client_id",
            &self.settings.client_id,
            ErrorKind::InvalidClient,
            "Invalid client id",
        )?;
        require_equal(
            params,
            "client_secret",
            &self.settings.client_secret,
            ErrorKind::InvalidClient,
            "Invalid client secret",
        )
    }

    async fn validate_code_grant(&self, params: &FormParams) -> Result<Session, ProtocolError> {
        require_all(params, &["code"])?;
        require_equal(
            params,
            "grant_type",
            GrantType::AuthorizationCode.as_str(),
            ErrorKind::UnsupportedGrantType,
            "Invalid grant type",
        )?;

        let code = params.get("code");
        self.sessions.grant(code).await.map_err(|e| {
            tracing::debug!(error = %e, "Code redemption refused");
            ProtocolError::invalid_grant(format!("Invalid code: {}", code))
        })
    }

    async fn validate_refresh_grant(&self, params: &FormParams) -> Result<Session, ProtocolError> {
        require_all(params, &["refresh_token"])?;
        require_equal(
            params,
            "grant_type",
            GrantType::RefreshToken.as_str(),
            ErrorKind::UnsupportedGrantType,
            "Invalid grant type",
        )?;

        let token = self.authorize_token(params.get("refresh_token"))?;
        self.sessions.get_by_token(&token.claims).await.map_err(|e| {
            tracing::debug!(error = %e, "Refresh token session lookup failed");
            ProtocolError::invalid_grant("Invalid refresh token")
        })
    }

    /// Mints the token set for `session`. A refresh grant returns the
    /// submitted refresh token unchanged.
    fn issue_tokens(
        &self,
        session: &Session,
        grant: GrantType,
        submitted_refresh_token: &str,
    ) -> Result<TokenResponse, ProtocolError> {
        let now = self.clock.now();
        let keys = self.keys.as_ref();

        let access_token = session
            .access_token(&self.token_settings, keys, now)
            .map_err(internal_error)?;

        let id_token = if session.scopes.first().map(String::as_str) == Some(OPENID_SCOPE) {
            Some(
                session
                    .id_token(&self.token_settings, keys, now)
                    .map_err(internal_error)?,
            )
        } else {
            None
        };

        let refresh_token = match grant {
            GrantType::RefreshToken => submitted_refresh_token.to_string(),
            GrantType::AuthorizationCode => session
                .refresh_token(&self.token_settings, keys, now)
                .map_err(internal_error)?,
        };

        Ok(TokenResponse {
            access_token,
            id_token,
            refresh_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.settings.access_ttl.num_seconds(),
        })
    }
}

/// Decodes `client_id:client_secret` from an HTTP Basic `Authorization`
/// header. Anything else yields `None`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (client_id, client_secret) = decoded.split_once(':')?;
    Some((client_id.to_string(), client_secret.to_string()))
}
