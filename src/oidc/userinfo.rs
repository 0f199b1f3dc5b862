//! Userinfo endpoint
//!
//! Returns the claims of the user behind a bearer access token, filtered by
//! the scopes of the session the token was minted for.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::{Map, Value};

use crate::oidc::error::{internal_error, ProtocolError};
use crate::oidc::{response, Provider};

/// `GET /oidc/userinfo`
pub async fn userinfo(
    State(provider): State<Arc<Provider>>,
    headers: HeaderMap,
) -> Result<Response, ProtocolError> {
    let claims = provider.userinfo(&headers).await?;
    Ok(response::json(&claims))
}

impl Provider {
    /// Resolves the bearer token in `headers` to its user's scoped claims.
    ///
    /// # Errors
    ///
    /// Bearer errors for an unusable token; `internal_server_error` when the
    /// token's session no longer exists.
    pub async fn userinfo(&self, headers: &HeaderMap) -> Result<Map<String, Value>, ProtocolError> {
        let token = self.authorize_bearer(headers)?;
        let session = self
            .sessions
            .get_by_token(&token.claims)
            .await
            .map_err(internal_error)?;
        Ok(session.user.scoped_claims(&session.scopes))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{header, HeaderValue, StatusCode};

    use super::*;
    use crate::test_utils::{fixed_clock, test_provider};
    use crate::user::MockUser;

    async fn bearer_for(provider: &Provider, scopes: &[&str]) -> HeaderMap {
        let session = provider
            .sessions
            .create(
                scopes.iter().map(|s| s.to_string()).collect(),
                None,
                MockUser::default(),
            )
            .await
            .unwrap();
        let token = session
            .access_token(
                &provider.token_settings,
                provider.keys.as_ref(),
                provider.clock.now(),
            )
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_userinfo_filters_by_scope() {
        let provider = test_provider(fixed_clock());
        let headers = bearer_for(&provider, &["openid", "email"]).await;

        let claims = provider.userinfo(&headers).await.unwrap();
        assert_eq!(claims["sub"], "1234567890");
        assert_eq!(claims["email"], "jane.doe@example.com");
        assert_eq!(claims["email_verified"], true);
        assert!(!claims.contains_key("preferred_username"));
        assert!(!claims.contains_key("groups"));
    }

    #[tokio::test]
    async fn test_userinfo_profile_and_groups() {
        let provider = test_provider(fixed_clock());
        let headers = bearer_for(&provider, &["openid", "profile", "groups"]).await;

        let claims = provider.userinfo(&headers).await.unwrap();
        assert_eq!(claims["preferred_username"], "jane.doe");
        assert_eq!(claims["groups"], serde_json::json!(["engineering", "design"]));
        assert!(!claims.contains_key("email"));
    }

    #[tokio::test]
    async fn test_userinfo_requires_bearer() {
        let provider = test_provider(fixed_clock());
        let err = provider.userinfo(&HeaderMap::new()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.description, "Invalid authorization header");
    }
}
