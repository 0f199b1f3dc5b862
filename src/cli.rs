//! Command-line interface definition for mockoidc
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for running the provider and generating keys.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mockoidc - Mock OpenID Connect provider
///
/// Serves the authorization code flow with refresh tokens, userinfo,
/// discovery and JWKS for a single configured client. Intended for tests
/// and local development only.
#[derive(Parser, Debug, Clone)]
#[command(name = "mockoidc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/mockoidc.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for mockoidc
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the provider and serve until interrupted
    Serve {
        /// Socket address to listen on (overrides server.bind_address)
        #[arg(short, long)]
        bind: Option<String>,

        /// Externally visible base URL (overrides server.public_url)
        #[arg(long)]
        public_url: Option<String>,

        /// Client id to accept (overrides client.client_id)
        #[arg(long)]
        client_id: Option<String>,

        /// Client secret to accept (overrides client.client_secret)
        #[arg(long)]
        client_secret: Option<String>,
    },

    /// Generate an RSA private key (PKCS#1 PEM) for keys.private_key_file
    Keygen {
        /// Write the key to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
