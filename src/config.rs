//! Configuration management for mockoidc
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Later sources win: file, then `MOCKOIDC_*` environment variables, then
//! command-line flags.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::{Cli, Commands};
use crate::error::{MockOidcError, Result};
use crate::user::MockUser;

/// Main configuration structure for mockoidc
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// The single client the provider accepts
    #[serde(default)]
    pub client: ClientConfig,

    /// Token lifetimes
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Signing key source
    #[serde(default)]
    pub keys: KeysConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Users queued for the first authorization requests, in order
    #[serde(default)]
    pub users: Vec<MockUser>,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on; port 0 picks a free port
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Externally visible base URL advertised in discovery and used as the
    /// issuer prefix. Defaults to `http://<bound address>`.
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            public_url: None,
        }
    }
}

/// Client credentials
///
/// Unset values are replaced with random 32-character strings at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Token lifetime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Lifetime of access and ID tokens, in seconds
    #[serde(default = "default_access_ttl_seconds")]
    pub access_ttl_seconds: u64,

    /// Lifetime of refresh tokens, in seconds
    #[serde(default = "default_refresh_ttl_seconds")]
    pub refresh_ttl_seconds: u64,
}

fn default_access_ttl_seconds() -> u64 {
    600
}

fn default_refresh_ttl_seconds() -> u64 {
    3600
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_ttl_seconds: default_access_ttl_seconds(),
            refresh_ttl_seconds: default_refresh_ttl_seconds(),
        }
    }
}

impl TokenConfig {
    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.access_ttl_seconds).unwrap_or(i64::MAX))
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.refresh_ttl_seconds).unwrap_or(i64::MAX))
    }
}

/// Signing key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysConfig {
    /// PKCS#1 or PKCS#8 PEM file holding the RSA private key. When unset a
    /// fresh key is generated on every start.
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level for the `mockoidc` target; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MockOidcError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| MockOidcError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(bind_address) = std::env::var("MOCKOIDC_BIND_ADDRESS") {
            self.server.bind_address = bind_address;
        }

        if let Ok(public_url) = std::env::var("MOCKOIDC_PUBLIC_URL") {
            self.server.public_url = Some(public_url);
        }

        if let Ok(client_id) = std::env::var("MOCKOIDC_CLIENT_ID") {
            self.client.client_id = Some(client_id);
        }

        if let Ok(client_secret) = std::env::var("MOCKOIDC_CLIENT_SECRET") {
            self.client.client_secret = Some(client_secret);
        }

        if let Ok(ttl) = std::env::var("MOCKOIDC_ACCESS_TTL_SECONDS") {
            if let Ok(value) = ttl.parse() {
                self.tokens.access_ttl_seconds = value;
            } else {
                tracing::warn!("Invalid MOCKOIDC_ACCESS_TTL_SECONDS: {}", ttl);
            }
        }

        if let Ok(ttl) = std::env::var("MOCKOIDC_REFRESH_TTL_SECONDS") {
            if let Ok(value) = ttl.parse() {
                self.tokens.refresh_ttl_seconds = value;
            } else {
                tracing::warn!("Invalid MOCKOIDC_REFRESH_TTL_SECONDS: {}", ttl);
            }
        }

        if let Ok(key_file) = std::env::var("MOCKOIDC_PRIVATE_KEY_FILE") {
            self.keys.private_key_file = Some(PathBuf::from(key_file));
        }

        if let Ok(level) = std::env::var("MOCKOIDC_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("MOCKOIDC_JSON_LOGS") {
            match json_logs.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.logging.json_format = true,
                "0" | "false" | "no" => self.logging.json_format = false,
                _ => tracing::warn!("Invalid MOCKOIDC_JSON_LOGS: {}", json_logs),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }

        if let Commands::Serve {
            bind,
            public_url,
            client_id,
            client_secret,
        } = &cli.command
        {
            if let Some(bind) = bind {
                self.server.bind_address = bind.clone();
            }
            if let Some(public_url) = public_url {
                self.server.public_url = Some(public_url.clone());
            }
            if let Some(client_id) = client_id {
                self.client.client_id = Some(client_id.clone());
            }
            if let Some(client_secret) = client_secret {
                self.client.client_secret = Some(client_secret.clone());
            }
        }
    }

    /// Parsed listener address.
    ///
    /// # Errors
    ///
    /// Returns error if `server.bind_address` is not a socket address
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server.bind_address.parse().map_err(|e| {
            MockOidcError::Config(format!(
                "Invalid server.bind_address '{}': {}",
                self.server.bind_address, e
            ))
            .into()
        })
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;

        if let Some(public_url) = &self.server.public_url {
            let url = Url::parse(public_url).map_err(|e| {
                MockOidcError::Config(format!("Invalid server.public_url '{}': {}", public_url, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
                return Err(MockOidcError::Config(format!(
                    "server.public_url must be an absolute http(s) URL, got '{}'",
                    public_url
                ))
                .into());
            }
        }

        if matches!(&self.client.client_id, Some(id) if id.is_empty()) {
            return Err(
                MockOidcError::Config("client.client_id cannot be empty".to_string()).into(),
            );
        }

        if matches!(&self.client.client_secret, Some(secret) if secret.is_empty()) {
            return Err(
                MockOidcError::Config("client.client_secret cannot be empty".to_string()).into(),
            );
        }

        if self.tokens.access_ttl_seconds == 0 {
            return Err(MockOidcError::Config(
                "tokens.access_ttl_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.tokens.refresh_ttl_seconds < self.tokens.access_ttl_seconds {
            return Err(MockOidcError::Config(
                "tokens.refresh_ttl_seconds must be at least tokens.access_ttl_seconds"
                    .to_string(),
            )
            .into());
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(MockOidcError::Config(format!(
                "Invalid logging.level: {}. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ))
            .into());
        }

        Ok(())
    }
}
