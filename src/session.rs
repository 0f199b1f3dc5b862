//! Authorization sessions and the session store
//!
//! A [`Session`] is one authorization transaction. Its identifier is the
//! authorization code handed to the client, and it is also written into the
//! `jti` claim of every token minted for it, which is how tokens presented
//! later are mapped back to their session.
//!
//! The store owns sessions. Request handlers only read them, and flip
//! `granted` through [`SessionStore::grant`], which must be an atomic
//! check-and-set: concurrent redemptions of one code yield exactly one
//! success.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::{MockOidcError, Result};
use crate::keys::KeyAuthority;
use crate::queue::Queue;
use crate::user::MockUser;

// ---------------------------------------------------------------------------
// Token settings
// ---------------------------------------------------------------------------

/// Provider-wide values stamped into every minted token.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// The `iss` claim.
    pub issuer: String,

    /// The `aud` claim; the single configured client.
    pub audience: String,

    /// Lifetime of access and ID tokens.
    pub access_ttl: Duration,

    /// Lifetime of refresh tokens.
    pub refresh_ttl: Duration,
}

/// Registered claims shared by access, refresh and ID tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardClaims {
    pub aud: String,
    pub exp: i64,
    pub jti: String,
    pub iat: i64,
    pub iss: String,
    pub nbf: i64,
    pub sub: String,
}

impl StandardClaims {
    fn new(settings: &TokenSettings, session: &Session, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            aud: settings.audience.clone(),
            exp: (now + ttl).timestamp(),
            jti: session.id.clone(),
            iat: now.timestamp(),
            iss: settings.issuer.clone(),
            nbf: now.timestamp(),
            sub: session.user.subject.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One authorization transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque identifier; doubles as the authorization code.
    pub id: String,

    /// Requested scopes, in request order.
    pub scopes: Vec<String>,

    /// Nonce from the authorization request, echoed into the ID token.
    pub nonce: Option<String>,

    /// The synthetic user this session authenticates.
    pub user: MockUser,

    /// Set once the authorization code has been redeemed.
    pub granted: bool,
}

impl Session {
    /// Mints a signed access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the key authority fails to sign.
    pub fn access_token(
        &self,
        settings: &TokenSettings,
        keys: &dyn KeyAuthority,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let claims = StandardClaims::new(settings, self, settings.access_ttl, now);
        keys.sign(&serde_json::to_value(claims)?)
    }

    /// Mints a signed refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the key authority fails to sign.
    pub fn refresh_token(
        &self,
        settings: &TokenSettings,
        keys: &dyn KeyAuthority,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let claims = StandardClaims::new(settings, self, settings.refresh_ttl, now);
        keys.sign(&serde_json::to_value(claims)?)
    }

    /// Mints a signed ID token carrying the user's scope-filtered claims and
    /// the request nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if the key authority fails to sign.
    pub fn id_token(
        &self,
        settings: &TokenSettings,
        keys: &dyn KeyAuthority,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let mut claims = self.user.scoped_claims(&self.scopes);
        if let Value::Object(standard) = serde_json::to_value(StandardClaims::new(
            settings,
            self,
            settings.access_ttl,
            now,
        ))? {
            claims.extend(standard);
        }
        if let Some(nonce) = &self.nonce {
            claims.insert("nonce".to_string(), Value::String(nonce.clone()));
        }
        keys.sign(&Value::Object(claims))
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Storage for authorization sessions.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Creates and stores a new, ungranted session.
    async fn create(
        &self,
        scopes: Vec<String>,
        nonce: Option<String>,
        user: MockUser,
    ) -> Result<Session>;

    /// Fetches the session with identifier `id`.
    async fn get_by_id(&self, id: &str) -> Result<Session>;

    /// Fetches the session a verified token was minted for, using its `jti`
    /// claim.
    async fn get_by_token(&self, claims: &Map<String, Value>) -> Result<Session>;

    /// Marks the session `id` as granted and returns it.
    ///
    /// Fails if the session does not exist or was already granted. The check
    /// and the update happen atomically.
    async fn grant(&self, id: &str) -> Result<Session>;
}

/// In-memory [`SessionStore`].
///
/// Sessions live for the lifetime of the process. Codes queued with
/// [`MemorySessionStore::queue_code`] are used as session identifiers before
/// falling back to random ones.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    codes: Queue<String>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `code` as the identifier of the next created session.
    pub async fn queue_code(&self, code: impl Into<String>) {
        self.codes.push(code.into()).await;
    }

    async fn next_id(&self) -> String {
        match self.codes.pop().await {
            Some(code) => code,
            None => random_alphanumeric(32),
        }
    }
}

/// Random string of `len` ASCII letters and digits.
pub(crate) fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        scopes: Vec<String>,
        nonce: Option<String>,
        user: MockUser,
    ) -> Result<Session> {
        let session = Session {
            id: self.next_id().await,
            scopes,
            nonce,
            user,
            granted: false,
        };
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        tracing::debug!(
            session_id = %session.id,
            subject = %session.user.subject,
            "Created session"
        );
        Ok(session)
    }

    async fn get_by_id(&self, id: &str) -> Result<Session> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| MockOidcError::SessionNotFound(id.to_string()).into())
    }

    async fn get_by_token(&self, claims: &Map<String, Value>) -> Result<Session> {
        let id = claims
            .get("jti")
            .and_then(Value::as_str)
            .ok_or_else(|| MockOidcError::SessionNotFound("token has no jti claim".to_string()))?;
        self.get_by_id(id).await
    }

    async fn grant(&self, id: &str) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| MockOidcError::SessionNotFound(id.to_string()))?;
        if session.granted {
            return Err(MockOidcError::SessionAlreadyGranted(id.to_string()).into());
        }
        session.granted = true;
        Ok(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::test_utils::shared_keypair;

    fn settings() -> TokenSettings {
        TokenSettings {
            issuer: "http://127.0.0.1:8080/oidc".to_string(),
            audience: "client".to_string(),
            access_ttl: Duration::minutes(10),
            refresh_ttl: Duration::hours(1),
        }
    }

    fn session(scopes: &[&str], nonce: Option<&str>) -> Session {
        Session {
            id: "session-1".to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            nonce: nonce.map(str::to_string),
            user: MockUser::default(),
            granted: false,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_access_token_claims() {
        let keys = shared_keypair();
        let token = session(&["openid"], None)
            .access_token(&settings(), keys, now())
            .expect("mint");
        let claims: StandardClaims =
            serde_json::from_value(keys.verify(&token).expect("verify")).expect("claims");
        assert_eq!(claims.aud, "client");
        assert_eq!(claims.iss, "http://127.0.0.1:8080/oidc");
        assert_eq!(claims.jti, "session-1");
        assert_eq!(claims.sub, "1234567890");
        assert_eq!(claims.iat, now().timestamp());
        assert_eq!(claims.nbf, now().timestamp());
        assert_eq!(claims.exp, now().timestamp() + 600);
    }

    #[test]
    fn test_refresh_token_uses_refresh_ttl() {
        let keys = shared_keypair();
        let token = session(&["openid"], None)
            .refresh_token(&settings(), keys, now())
            .expect("mint");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims["exp"], now().timestamp() + 3600);
    }

    #[test]
    fn test_id_token_carries_nonce_and_scoped_claims() {
        let keys = shared_keypair();
        let token = session(&["openid", "email"], Some("n-0S6"))
            .id_token(&settings(), keys, now())
            .expect("mint");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims["nonce"], "n-0S6");
        assert_eq!(claims["email"], "jane.doe@example.com");
        assert_eq!(claims["email_verified"], true);
        assert_eq!(claims["sub"], "1234567890");
        assert_eq!(claims["aud"], "client");
        assert!(claims.get("preferred_username").is_none());
    }

    #[test]
    fn test_id_token_without_nonce() {
        let keys = shared_keypair();
        let token = session(&["openid"], None)
            .id_token(&settings(), keys, now())
            .expect("mint");
        let claims = keys.verify(&token).expect("verify");
        assert!(claims.get("nonce").is_none());
    }

    #[tokio::test]
    async fn test_create_and_get_by_id() {
        let store = MemorySessionStore::new();
        let created = store
            .create(vec!["openid".to_string()], None, MockUser::default())
            .await
            .expect("create");
        assert_eq!(created.id.len(), 32);
        assert!(!created.granted);

        let fetched = store.get_by_id(&created.id).await.expect("fetch");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_queued_codes_become_session_ids() {
        let store = MemorySessionStore::new();
        store.queue_code("code-one").await;
        let first = store
            .create(Vec::new(), None, MockUser::default())
            .await
            .expect("create");
        let second = store
            .create(Vec::new(), None, MockUser::default())
            .await
            .expect("create");
        assert_eq!(first.id, "code-one");
        assert_ne!(second.id, "code-one");
    }

    #[tokio::test]
    async fn test_get_by_id_missing() {
        let store = MemorySessionStore::new();
        let err = store.get_by_id("nope").await.unwrap_err();
        assert!(err.to_string().contains("Session not found"));
    }

    #[tokio::test]
    async fn test_get_by_token_resolves_jti() {
        let store = MemorySessionStore::new();
        let created = store
            .create(Vec::new(), None, MockUser::default())
            .await
            .expect("create");

        let mut claims = Map::new();
        claims.insert("jti".to_string(), Value::String(created.id.clone()));
        assert_eq!(store.get_by_token(&claims).await.expect("fetch").id, created.id);

        assert!(store.get_by_token(&Map::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_grant_is_single_use() {
        let store = MemorySessionStore::new();
        let created = store
            .create(Vec::new(), None, MockUser::default())
            .await
            .expect("create");

        let granted = store.grant(&created.id).await.expect("first grant");
        assert!(granted.granted);

        let err = store.grant(&created.id).await.unwrap_err();
        assert!(err.to_string().contains("already granted"));
        assert!(store.grant("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_grants_succeed_once() {
        let store = Arc::new(MemorySessionStore::new());
        let created = store
            .create(Vec::new(), None, MockUser::default())
            .await
            .expect("create");

        let attempts: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = created.id.clone();
                tokio::spawn(async move { store.grant(&id).await.is_ok() })
            })
            .collect();

        let mut successes = 0;
        for attempt in attempts {
            if attempt.await.expect("join") {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
