//! Running provider instances
//!
//! [`MockOidcServer`] binds a listener, serves [`crate::oidc::router`] on a
//! background task and keeps typed handles to the collaborators so tests can
//! steer the provider while it runs: queue users, codes and errors, or move
//! the clock forward.
//!
//! Dropping the handle stops the server.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::{MockOidcError, Result};
use crate::keys::{KeyAuthority, RsaKeypair};
use crate::oidc::error::ProtocolError;
use crate::oidc::{router, Provider, ProviderSettings, DISCOVERY_ENDPOINT};
use crate::session::{random_alphanumeric, MemorySessionStore};
use crate::user::{MockUser, UserQueue};

const GENERATED_CREDENTIAL_LEN: usize = 32;

/// Builder for configuring a [`MockOidcServer`].
#[derive(Debug, Clone)]
pub struct MockOidcServerBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    public_url: Option<String>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    keys: Option<Arc<dyn KeyAuthority>>,
    users: Vec<MockUser>,
}

impl Default for MockOidcServerBuilder {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            public_url: None,
            access_ttl: Duration::minutes(10),
            refresh_ttl: Duration::hours(1),
            keys: None,
            users: Vec::new(),
        }
    }
}

impl MockOidcServerBuilder {
    /// Creates a builder from validated configuration. Loads the private key
    /// file when one is configured.
    ///
    /// # Errors
    ///
    /// Returns error if the key file cannot be read or parsed
    pub fn from_config(config: &Config) -> Result<Self> {
        let keys: Option<Arc<dyn KeyAuthority>> = match &config.keys.private_key_file {
            Some(path) => {
                tracing::info!("Loading signing key from {}", path.display());
                Some(Arc::new(RsaKeypair::from_pem_file(path)?))
            }
            None => None,
        };

        Ok(Self {
            client_id: config.client.client_id.clone(),
            client_secret: config.client.client_secret.clone(),
            public_url: config.server.public_url.clone(),
            access_ttl: config.tokens.access_ttl(),
            refresh_ttl: config.tokens.refresh_ttl(),
            keys,
            users: config.users.clone(),
        })
    }

    /// Sets the client credentials. Unset credentials are generated.
    pub fn with_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Overrides the advertised base URL.
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into());
        self
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Uses `keys` instead of a freshly generated RSA key.
    pub fn with_keys(mut self, keys: Arc<dyn KeyAuthority>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Queues `user` for an early authorization request.
    pub fn with_user(mut self, user: MockUser) -> Self {
        self.users.push(user);
        self
    }

    /// Spawns the server on a random free port of 127.0.0.1.
    ///
    /// # Errors
    ///
    /// See [`MockOidcServerBuilder::spawn`].
    pub async fn spawn_on_free_port(self) -> Result<MockOidcServer> {
        self.spawn(SocketAddr::from(([127, 0, 0, 1], 0))).await
    }

    /// Binds `address` and starts serving.
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound or a key cannot be
    /// generated
    pub async fn spawn(self, address: SocketAddr) -> Result<MockOidcServer> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| MockOidcError::Server(format!("Failed to bind {}: {}", address, e)))?;
        let local_addr = listener.local_addr()?;

        let base_url = match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", local_addr),
        };

        let keys: Arc<dyn KeyAuthority> = match self.keys {
            Some(keys) => keys,
            None => {
                tracing::debug!("Generating RSA signing key");
                let keypair = tokio::task::spawn_blocking(RsaKeypair::generate)
                    .await
                    .map_err(|e| MockOidcError::KeyAuthority(e.to_string()))??;
                Arc::new(keypair)
            }
        };

        let settings = ProviderSettings {
            base_url: base_url.clone(),
            client_id: self
                .client_id
                .unwrap_or_else(|| random_alphanumeric(GENERATED_CREDENTIAL_LEN)),
            client_secret: self
                .client_secret
                .unwrap_or_else(|| random_alphanumeric(GENERATED_CREDENTIAL_LEN)),
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
        };

        let sessions = Arc::new(MemorySessionStore::new());
        let users = Arc::new(UserQueue::new());
        for user in self.users {
            users.push(user).await;
        }
        let clock = Arc::new(SystemClock::new());

        let provider = Arc::new(
            Provider::new(settings, keys)
                .with_sessions(sessions.clone())
                .with_users(users.clone())
                .with_clock(clock.clone()),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let server = axum::serve(listener, router(Arc::clone(&provider)))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
        let task = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::error!(error = %e, "Server terminated with error");
            }
        });

        tracing::info!(
            address = %local_addr,
            issuer = %provider.settings().issuer(),
            "Mock OIDC provider listening"
        );

        Ok(MockOidcServer {
            base_url,
            local_addr,
            provider,
            sessions,
            users,
            clock,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

/// Running instance of the mock provider.
///
/// # Examples
///
/// ```no_run
/// use mockoidc::server::MockOidcServer;
///
/// # async fn example() -> mockoidc::error::Result<()> {
/// let server = MockOidcServer::builder()
///     .with_client("app", "s3cret")
///     .spawn_on_free_port()
///     .await?;
/// println!("discovery at {}", server.discovery_url());
/// server.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockOidcServer {
    base_url: String,
    local_addr: SocketAddr,
    provider: Arc<Provider>,
    sessions: Arc<MemorySessionStore>,
    users: Arc<UserQueue>,
    clock: Arc<SystemClock>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MockOidcServer {
    pub fn builder() -> MockOidcServerBuilder {
        MockOidcServerBuilder::default()
    }

    /// Returns the base URL, e.g. `http://127.0.0.1:41234`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the bound socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the issuer identifier.
    pub fn issuer(&self) -> String {
        self.provider.settings().issuer()
    }

    /// Returns the discovery document URL.
    pub fn discovery_url(&self) -> String {
        self.provider.settings().endpoint_url(DISCOVERY_ENDPOINT)
    }

    pub fn client_id(&self) -> &str {
        &self.provider.settings().client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.provider.settings().client_secret
    }

    /// Binds `user` to the next authorization request.
    pub async fn queue_user(&self, user: MockUser) {
        self.users.push(user).await;
    }

    /// Uses `code` as the authorization code of the next authorization
    /// request.
    pub async fn queue_code(&self, code: impl Into<String>) {
        self.sessions.queue_code(code).await;
    }

    /// Makes the next request to any endpoint fail with `err`.
    pub async fn queue_error(&self, err: ProtocolError) {
        self.provider.queue_error(err).await;
    }

    /// Moves the provider clock forward by `by`.
    pub fn fast_forward(&self, by: Duration) {
        self.clock.fast_forward(by);
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Server task failed");
            }
        }
        tracing::info!("Mock OIDC provider stopped");
    }
}

impl Drop for MockOidcServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
