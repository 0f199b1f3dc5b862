//! mockoidc - Mock OpenID Connect provider library
//!
//! This library provides a minimal OpenID Connect provider for tests and
//! local development: the authorization code flow with refresh tokens,
//! userinfo, discovery and JWKS publication, for one configured client.
//! No user is ever authenticated; every authorization request is approved
//! for the next queued synthetic user.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `oidc`: Protocol endpoints, request validation and the HTTP router
//! - `session`: Authorization sessions, token minting and the session store
//! - `keys`: Token signing, verification and JWKS export
//! - `user`: Synthetic users and the user supply
//! - `clock`: Injectable time source
//! - `queue`: Async FIFO behind the queued users, codes and errors
//! - `server`: Running instances with a test-control handle
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use mockoidc::{MockOidcServer, MockUser};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = MockOidcServer::builder()
//!         .with_client("my-app", "my-secret")
//!         .spawn_on_free_port()
//!         .await?;
//!
//!     server
//!         .queue_user(MockUser {
//!             subject: "alice".to_string(),
//!             ..MockUser::default()
//!         })
//!         .await;
//!
//!     // Point the client under test at server.discovery_url()
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod keys;
pub mod oidc;
pub mod queue;
pub mod server;
pub mod session;
pub mod user;

// Re-export commonly used types
pub use config::Config;
pub use error::{MockOidcError, Result};
pub use keys::{KeyAuthority, RsaKeypair};
pub use oidc::error::{ErrorKind, ProtocolError};
pub use oidc::{router, Provider, ProviderSettings};
pub use server::{MockOidcServer, MockOidcServerBuilder};
pub use user::MockUser;

#[cfg(test)]
pub mod test_utils;
