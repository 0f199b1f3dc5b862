//! Test utilities for mockoidc
//!
//! Shared fixtures for unit tests: one RSA key per test binary (generation
//! is slow), a frozen clock and a provider wired to both.

use std::sync::{Arc, OnceLock};

use chrono::{TimeZone, Utc};

use crate::clock::FixedClock;
use crate::keys::{KeyAuthority, RsaKeypair};
use crate::oidc::{Provider, ProviderSettings};

pub const TEST_CLIENT_ID: &str = "test-client";
pub const TEST_CLIENT_SECRET: &str = "test-secret";
pub const TEST_BASE_URL: &str = "http://127.0.0.1:8080";

static KEYPAIR: OnceLock<Arc<RsaKeypair>> = OnceLock::new();

fn keypair() -> &'static Arc<RsaKeypair> {
    KEYPAIR.get_or_init(|| Arc::new(RsaKeypair::generate().expect("generate test RSA key")))
}

/// The RSA key shared by every test in this binary.
pub fn shared_keypair() -> &'static RsaKeypair {
    keypair().as_ref()
}

/// [`shared_keypair`] as a key authority handle.
pub fn shared_keypair_arc() -> Arc<dyn KeyAuthority> {
    keypair().clone()
}

/// A clock frozen at 2024-01-01T00:00:00Z.
pub fn fixed_clock() -> Arc<FixedClock> {
    let at = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp");
    Arc::new(FixedClock::new(at))
}

/// Settings with the test client and the default lifetimes.
pub fn test_settings() -> ProviderSettings {
    ProviderSettings {
        base_url: TEST_BASE_URL.to_string(),
        client_id: TEST_CLIENT_ID.to_string(),
        client_secret: TEST_CLIENT_SECRET.to_string(),
        access_ttl: chrono::Duration::minutes(10),
        refresh_ttl: chrono::Duration::hours(1),
    }
}

/// A provider using the shared key and `clock`.
pub fn test_provider(clock: Arc<FixedClock>) -> Provider {
    Provider::new(test_settings(), shared_keypair_arc()).with_clock(clock)
}
