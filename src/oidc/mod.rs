//! OpenID Connect provider endpoints
//!
//! This module implements the protocol side of the mock provider: request
//! validation, the authorization code → token → refresh lifecycle, bearer
//! token checks, userinfo, discovery and key publication.
//!
//! # Module Layout
//!
//! - [`authorize`] -- `authorization_endpoint`, issues codes by redirect
//! - [`token`]     -- `token_endpoint`, code and refresh-token grants
//! - [`userinfo`]  -- `userinfo_endpoint`, scope-filtered claims
//! - [`discovery`] -- discovery document and JWKS publication
//! - [`bearer`]    -- bearer token verification shared by the above
//! - [`validate`]  -- parameter assertions
//! - [`params`]    -- merged query/body form parameters
//! - [`response`]  -- response assembly (headers, JSON bodies, redirects)
//! - [`error`]     -- the protocol error taxonomy
//!
//! # Flow
//!
//! ```text
//! authorize --302 code--> token(authorization_code) --> token set
//!                                     |
//!              userinfo(access token) +--> token(refresh_token) --> token set
//! ```
//!
//! [`Provider`] holds the immutable settings and the collaborator handles
//! (sessions, keys, users, clock); [`router`] exposes it over HTTP.

pub mod authorize;
pub mod bearer;
pub mod discovery;
pub mod error;
pub mod params;
pub mod response;
pub mod token;
pub mod userinfo;
pub mod validate;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Duration;

use crate::clock::{Clock, SystemClock};
use crate::keys::KeyAuthority;
use crate::queue::Queue;
use crate::session::{MemorySessionStore, SessionStore, TokenSettings};
use crate::user::{UserQueue, UserSupply};
use error::ProtocolError;

// ---------------------------------------------------------------------------
// Endpoints and capabilities
// ---------------------------------------------------------------------------

/// Path prefix of the issuer.
pub const ISSUER_BASE: &str = "/oidc";
pub const AUTHORIZATION_ENDPOINT: &str = "/oidc/authorize";
pub const TOKEN_ENDPOINT: &str = "/oidc/token";
pub const USERINFO_ENDPOINT: &str = "/oidc/userinfo";
pub const JWKS_ENDPOINT: &str = "/oidc/.well-known/jwks.json";
pub const DISCOVERY_ENDPOINT: &str = "/oidc/.well-known/openid-configuration";

/// First scope that makes a token response include an ID token.
pub const OPENID_SCOPE: &str = "openid";

pub const GRANT_TYPES_SUPPORTED: &[&str] = &["authorization_code", "refresh_token"];
pub const RESPONSE_TYPES_SUPPORTED: &[&str] = &["code"];
pub const SUBJECT_TYPES_SUPPORTED: &[&str] = &["public"];
pub const ID_TOKEN_SIGNING_ALG_VALUES_SUPPORTED: &[&str] = &["RS256"];
pub const SCOPES_SUPPORTED: &[&str] = &["openid", "email", "groups", "profile"];
pub const TOKEN_ENDPOINT_AUTH_METHODS_SUPPORTED: &[&str] =
    &["client_secret_basic", "client_secret_post"];
pub const CLAIMS_SUPPORTED: &[&str] = &[
    "sub",
    "email",
    "email_verified",
    "preferred_username",
    "phone_number",
    "address",
    "groups",
    "iss",
    "aud",
];

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Immutable provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Externally visible origin, e.g. `http://127.0.0.1:8080`, without a
    /// trailing slash.
    pub base_url: String,

    /// The only client allowed to use the provider.
    pub client_id: String,

    pub client_secret: String,

    /// Lifetime of access and ID tokens; also reported as `expires_in`.
    pub access_ttl: Duration,

    /// Lifetime of refresh tokens.
    pub refresh_ttl: Duration,
}

impl ProviderSettings {
    /// The issuer identifier, `base_url` + `/oidc`.
    pub fn issuer(&self) -> String {
        format!("{}{}", self.base_url, ISSUER_BASE)
    }

    /// Absolute URL of an endpoint path.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            issuer: self.issuer(),
            audience: self.client_id.clone(),
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
        }
    }
}

/// The protocol state machine together with its collaborators.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use chrono::Duration;
/// use mockoidc::keys::RsaKeypair;
/// use mockoidc::oidc::{router, Provider, ProviderSettings};
///
/// # fn example() -> mockoidc::error::Result<()> {
/// let settings = ProviderSettings {
///     base_url: "http://127.0.0.1:8080".to_string(),
///     client_id: "client".to_string(),
///     client_secret: "secret".to_string(),
///     access_ttl: Duration::minutes(10),
///     refresh_ttl: Duration::hours(1),
/// };
/// let provider = Provider::new(settings, Arc::new(RsaKeypair::generate()?));
/// let app = router(Arc::new(provider));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Provider {
    settings: ProviderSettings,
    token_settings: TokenSettings,
    sessions: Arc<dyn SessionStore>,
    keys: Arc<dyn KeyAuthority>,
    users: Arc<dyn UserSupply>,
    clock: Arc<dyn Clock>,
    errors: Queue<ProtocolError>,
}

impl Provider {
    /// Creates a provider with an in-memory session store, the default user
    /// queue and the system clock.
    pub fn new(settings: ProviderSettings, keys: Arc<dyn KeyAuthority>) -> Self {
        Self {
            token_settings: settings.token_settings(),
            settings,
            sessions: Arc::new(MemorySessionStore::new()),
            keys,
            users: Arc::new(UserQueue::new()),
            clock: Arc::new(SystemClock::new()),
            errors: Queue::new(),
        }
    }

    /// Replaces the session store.
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Replaces the user supply.
    pub fn with_users(mut self, users: Arc<dyn UserSupply>) -> Self {
        self.users = users;
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Makes the next request, to any endpoint, fail with `err`.
    pub async fn queue_error(&self, err: ProtocolError) {
        self.errors.push(err).await;
    }
}

/// Builds the HTTP routes for `provider`.
pub fn router(provider: Arc<Provider>) -> Router {
    Router::new()
        .route(
            AUTHORIZATION_ENDPOINT,
            get(authorize::authorize).post(authorize::authorize),
        )
        .route(TOKEN_ENDPOINT, post(token::token))
        .route(
            USERINFO_ENDPOINT,
            get(userinfo::userinfo).post(userinfo::userinfo),
        )
        .route(DISCOVERY_ENDPOINT, get(discovery::discovery))
        .route(JWKS_ENDPOINT, get(discovery::jwks))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&provider),
            serve_queued_error,
        ))
        .with_state(provider)
}

async fn serve_queued_error(
    State(provider): State<Arc<Provider>>,
    request: Request,
    next: Next,
) -> Response {
    match provider.errors.pop().await {
        Some(err) => {
            tracing::debug!(path = %request.uri().path(), "Answering with queued error");
            err.into_response()
        }
        None => next.run(request).await,
    }
}
