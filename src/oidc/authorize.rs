//! Authorization endpoint
//!
//! Validates an authorization request, starts a session for the next
//! queued user and redirects back to the client with the session id as the
//! authorization code. There is no login page; every valid request is
//! approved.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::response::Response;
use bytes::Bytes;
use url::{Position, Url};

use crate::oidc::error::{internal_error, ErrorKind, ProtocolError};
use crate::oidc::params::FormParams;
use crate::oidc::validate::{require_all, require_equal, require_scope_subset};
use crate::oidc::{response, Provider, AUTHORIZATION_ENDPOINT, SCOPES_SUPPORTED};

/// The only `response_type` accepted.
pub const RESPONSE_TYPE_CODE: &str = "code";

const REQUIRED_PARAMS: [&str; 5] = [
    "scope",
    "state",
    "client_id",
    "response_type",
    "redirect_uri",
];

/// Stand-in origin for resolving relative redirect targets.
const RELATIVE_REDIRECT_ORIGIN: &str = "http://relative.invalid";

/// `GET|POST /oidc/authorize`
pub async fn authorize(
    State(provider): State<Arc<Provider>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ProtocolError> {
    let params = FormParams::from_request(&headers, query.as_deref(), &body)?;
    let location = provider.authorize(&params).await?;
    Ok(response::redirect(&location))
}

impl Provider {
    /// Runs an authorization request and returns the client redirect target.
    ///
    /// Checks run in order: required parameters, scopes, client id,
    /// response type. A session is created only after all of them pass.
    ///
    /// # Errors
    ///
    /// - `invalid_request` (400) for a missing parameter
    /// - `invalid_scope` (400) for an unsupported scope
    /// - `invalid_client` (401) for a foreign client id
    /// - `unsupported_grant_type` (401) for a response type other than `code`
    /// - `internal_server_error` (500) when the session cannot be created or
    ///   `redirect_uri` is malformed
    pub async fn authorize(&self, params: &FormParams) -> Result<String, ProtocolError> {
        require_all(params, &REQUIRED_PARAMS)?;

        let scopes = parse_scope(params.get("scope"));
        require_scope_subset(&scopes, SCOPES_SUPPORTED)?;

        require_equal(
            params,
            "client_id",
            &self.settings.client_id,
            ErrorKind::InvalidClient,
            "Invalid client id",
        )?;
        require_equal(
            params,
            "response_type",
            RESPONSE_TYPE_CODE,
            ErrorKind::UnsupportedGrantType,
            "Invalid response type",
        )?;

        let user = self.users.next_user().await;
        let session = self
            .sessions
            .create(scopes, params.optional("nonce").map(str::to_string), user)
            .await
            .map_err(internal_error)?;

        let location =
            redirect_with_code(params.get("redirect_uri"), &session.id, params.get("state"))
                .map_err(|e| ProtocolError::internal(e.to_string()))?;

        tracing::info!(
            session_id = %session.id,
            subject = %session.user.subject,
            "Authorization code issued"
        );
        Ok(location)
    }
}

/// Splits a `scope` parameter on single spaces.
pub fn parse_scope(scope: &str) -> Vec<String> {
    scope.split(' ').map(str::to_string).collect()
}

/// Adds `code` and `state` to `redirect_uri`, replacing any values already
/// present and keeping its other query parameters. Query keys come out
/// sorted.
///
/// A relative `redirect_uri` stays relative. A relative path is resolved
/// against the authorization endpoint, as a browser following the redirect
/// would.
///
/// # Errors
///
/// Returns the parse error when `redirect_uri` is malformed.
pub fn redirect_with_code(
    redirect_uri: &str,
    code: &str,
    state: &str,
) -> Result<String, url::ParseError> {
    match Url::parse(redirect_uri) {
        Ok(mut location) => {
            merge_code_and_state(&mut location, code, state);
            Ok(location.into())
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(&format!(
                "{}{}",
                RELATIVE_REDIRECT_ORIGIN, AUTHORIZATION_ENDPOINT
            ))?;
            let mut location = base.join(redirect_uri)?;
            merge_code_and_state(&mut location, code, state);
            if location.host_str() == base.host_str() {
                Ok(location[Position::BeforePath..].to_string())
            } else {
                // Scheme-relative (`//host/cb`)
                Ok(format!("//{}", &location[Position::BeforeUsername..]))
            }
        }
        Err(e) => Err(e),
    }
}

fn merge_code_and_state(location: &mut Url, code: &str, state: &str) {
    let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in location.query_pairs() {
        query
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    query.insert("code".to_string(), vec![code.to_string()]);
    query.insert("state".to_string(), vec![state.to_string()]);

    let mut pairs = location.query_pairs_mut();
    pairs.clear();
    for (name, values) in &query {
        for value in values {
            pairs.append_pair(name, value);
        }
    }
}
