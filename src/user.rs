//! Synthetic users and the user supply
//!
//! The provider never authenticates anybody. Each authorization request is
//! bound to the next user handed out by a [`UserSupply`]; by default that is
//! a [`UserQueue`], which returns queued users in order and falls back to
//! [`MockUser::default`] when empty.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::queue::Queue;

/// Scope that releases `preferred_username`, `phone_number` and `address`.
pub const PROFILE_SCOPE: &str = "profile";
/// Scope that releases `email` and `email_verified`.
pub const EMAIL_SCOPE: &str = "email";
/// Scope that releases `groups`.
pub const GROUPS_SCOPE: &str = "groups";

/// A synthetic end user.
///
/// # Examples
///
/// ```
/// use mockoidc::user::MockUser;
///
/// let user = MockUser::default();
/// let claims = user.scoped_claims(&["email".to_string()]);
/// assert_eq!(claims["email"], "jane.doe@example.com");
/// assert!(claims.get("groups").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockUser {
    /// Subject identifier, the `sub` claim.
    pub subject: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub email_verified: bool,

    #[serde(default)]
    pub preferred_username: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub groups: Vec<String>,
}

impl Default for MockUser {
    fn default() -> Self {
        Self {
            subject: "1234567890".to_string(),
            email: "jane.doe@example.com".to_string(),
            email_verified: true,
            preferred_username: "jane.doe".to_string(),
            phone: "555-987-6543".to_string(),
            address: "123 Main Street".to_string(),
            groups: vec!["engineering".to_string(), "design".to_string()],
        }
    }
}

impl MockUser {
    /// Returns the claims released by `scopes`.
    ///
    /// `sub` is always present. Empty string fields and an empty group list
    /// are omitted, matching what a provider with sparse profile data returns.
    /// Unknown scopes release nothing.
    pub fn scoped_claims(&self, scopes: &[String]) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::String(self.subject.clone()));

        for scope in scopes {
            match scope.as_str() {
                PROFILE_SCOPE => {
                    insert_non_empty(&mut claims, "preferred_username", &self.preferred_username);
                    insert_non_empty(&mut claims, "phone_number", &self.phone);
                    insert_non_empty(&mut claims, "address", &self.address);
                }
                EMAIL_SCOPE => {
                    insert_non_empty(&mut claims, "email", &self.email);
                    claims.insert(
                        "email_verified".to_string(),
                        Value::Bool(self.email_verified),
                    );
                }
                GROUPS_SCOPE => {
                    if !self.groups.is_empty() {
                        claims.insert(
                            "groups".to_string(),
                            Value::Array(
                                self.groups.iter().cloned().map(Value::String).collect(),
                            ),
                        );
                    }
                }
                _ => {}
            }
        }

        claims
    }
}

fn insert_non_empty(claims: &mut Map<String, Value>, name: &str, value: &str) {
    if !value.is_empty() {
        claims.insert(name.to_string(), Value::String(value.to_string()));
    }
}

/// Hands out the user bound to each new authorization session.
#[async_trait::async_trait]
pub trait UserSupply: Send + Sync + std::fmt::Debug {
    /// Returns the user for the next session.
    async fn next_user(&self) -> MockUser;
}

/// FIFO of queued users with a default fallback.
#[derive(Debug, Default)]
pub struct UserQueue {
    queue: Queue<MockUser>,
    fallback: MockUser,
}

impl UserQueue {
    /// Creates an empty queue that falls back to [`MockUser::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue that falls back to `fallback`.
    pub fn with_fallback(fallback: MockUser) -> Self {
        Self {
            queue: Queue::new(),
            fallback,
        }
    }

    /// Queues `user` for the next authorization request.
    pub async fn push(&self, user: MockUser) {
        tracing::debug!(subject = %user.subject, "Queued mock user");
        self.queue.push(user).await;
    }
}

#[async_trait::async_trait]
impl UserSupply for UserQueue {
    async fn next_user(&self) -> MockUser {
        match self.queue.pop().await {
            Some(user) => user,
            None => self.fallback.clone(),
        }
    }
}
