use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use tower::ServiceExt;

use mockoidc::clock::FixedClock;
use mockoidc::keys::{KeyAuthority, RsaKeypair};
use mockoidc::oidc::{router, Provider, ProviderSettings};
use mockoidc::session::MemorySessionStore;
use mockoidc::user::UserQueue;

pub const CLIENT_ID: &str = "cid";
pub const CLIENT_SECRET: &str = "s3cret";
pub const BASE_URL: &str = "http://idp.test";
pub const REDIRECT_URI: &str = "https://app/cb";

static KEYPAIR: OnceLock<Arc<RsaKeypair>> = OnceLock::new();

/// One RSA key per test binary.
#[allow(dead_code)]
pub fn keypair() -> Arc<RsaKeypair> {
    KEYPAIR
        .get_or_init(|| Arc::new(RsaKeypair::generate().expect("failed to generate RSA key")))
        .clone()
}

/// A router-backed provider with handles on its collaborators.
#[allow(dead_code)]
pub struct TestProvider {
    pub app: Router,
    pub provider: Arc<Provider>,
    pub clock: Arc<FixedClock>,
    pub sessions: Arc<MemorySessionStore>,
    pub users: Arc<UserQueue>,
}

#[allow(dead_code)]
pub fn test_provider() -> TestProvider {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let sessions = Arc::new(MemorySessionStore::new());
    let users = Arc::new(UserQueue::new());
    let settings = ProviderSettings {
        base_url: BASE_URL.to_string(),
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        access_ttl: chrono::Duration::minutes(10),
        refresh_ttl: chrono::Duration::hours(1),
    };
    let keys: Arc<dyn KeyAuthority> = keypair();
    let provider = Arc::new(
        Provider::new(settings, keys)
            .with_clock(clock.clone())
            .with_sessions(sessions.clone())
            .with_users(users.clone()),
    );
    TestProvider {
        app: router(Arc::clone(&provider)),
        provider,
        clock,
        sessions,
        users,
    }
}

/// A response with its body collected.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn location(&self) -> url::Url {
        let location = self.headers[header::LOCATION]
            .to_str()
            .expect("location header");
        url::Url::parse(location).expect("absolute location")
    }
}

#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    TestResponse {
        status,
        headers,
        body,
    }
}

#[allow(dead_code)]
pub fn encode(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn get_with_query(path: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    get(&format!("{}?{}", path, encode(pairs)))
}

#[allow(dead_code)]
pub fn post_form(path: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(encode(pairs)))
        .unwrap()
}

#[allow(dead_code)]
pub fn get_with_bearer(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Runs a successful authorization request and returns the issued code.
#[allow(dead_code)]
pub async fn authorize(app: &Router, scope: &str) -> String {
    let response = send(
        app,
        get_with_query(
            "/oidc/authorize",
            &[
                ("client_id", CLIENT_ID),
                ("response_type", "code"),
                ("scope", scope),
                ("state", "abc"),
                ("redirect_uri", REDIRECT_URI),
            ],
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::FOUND, "{:?}", response.body);
    query_value(&response.location(), "code").expect("code in redirect")
}

/// Exchanges `code` for a token set.
#[allow(dead_code)]
pub async fn exchange_code(app: &Router, code: &str) -> TestResponse {
    send(
        app,
        post_form(
            "/oidc/token",
            &[
                ("client_id", CLIENT_ID),
                ("client_secret", CLIENT_SECRET),
                ("grant_type", "authorization_code"),
                ("code", code),
            ],
        ),
    )
    .await
}

#[allow(dead_code)]
pub fn query_value(url: &url::Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("mockoidc.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
