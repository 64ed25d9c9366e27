//! Integration tests for the signet HTTP API.
//!
//! Each test serves the real router on an ephemeral port, backed by a
//! temporary account store and media root, and talks to it over HTTP.

use anyhow::{Context, Result};
use argon2::Params;
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use serde_json::Value;
use signet::{
    accounts::{AccountRepository, AccountService, AvatarStore, PasswordHasher, Profile},
    api,
};
use std::{net::SocketAddr, sync::Arc};
use tempfile::TempDir;
use tokio::net::TcpListener;
use ulid::Ulid;

struct TestServer {
    dir: TempDir,
    addr: SocketAddr,
    client: Client,
}

impl TestServer {
    async fn start() -> Result<Self> {
        Self::start_with_limit(api::DEFAULT_MAX_BODY_BYTES).await
    }

    async fn start_with_limit(max_body_bytes: usize) -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create temp dir")?;

        let params = Params::new(1024, 1, 1, None).map_err(|e| anyhow::anyhow!("{e}"))?;
        let service = Arc::new(AccountService::new(
            Arc::new(AccountRepository::new(dir.path().join("users.json"))),
            PasswordHasher::new(params),
            AvatarStore::new(dir.path().join("avatars"), "/static/avatars", "default.png"),
        ));
        service.warm_up().await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = api::router(service, max_body_bytes);

        tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });

        Ok(Self {
            dir,
            addr,
            client: Client::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn register(&self, form: Form) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/register"))
            .multipart(form)
            .send()
            .await?)
    }

    async fn login(&self, username: &str, password: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?)
    }
}

fn registration_form(username: &str, password: &str, repeat: &str) -> Form {
    Form::new()
        .text("username", username.to_string())
        .text("password", password.to_string())
        .text("password_repeat", repeat.to_string())
        .text("email", format!("{username}@example.com"))
        .text("name", "Alice Liddell")
        .text("nickname", "al")
        .text("phone", "+1 555 0100")
        .text("gender", "female")
}

#[tokio::test]
async fn register_login_scenario() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .register(registration_form("alice", "secret", "secret"))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile: Profile = response.json().await?;
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.name, "Alice Liddell");
    assert_eq!(profile.avatar_url, "/static/avatars/default.png");

    let response = server
        .register(registration_form("alice", "secret", "secret"))
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let wrong_password = server.login("alice", "wrong").await?;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password_body: Value = wrong_password.json().await?;

    let response = server.login("alice", "secret").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let logged_in: Profile = response.json().await?;
    assert_eq!(logged_in, profile);

    let unknown_user = server.login("bob", "secret").await?;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let unknown_user_body: Value = unknown_user.json().await?;
    assert_eq!(unknown_user_body, wrong_password_body);

    // the store holds a digest, never the plaintext
    let raw = std::fs::read_to_string(server.dir.path().join("users.json"))?;
    let store: Value = serde_json::from_str(&raw)?;
    let digest = store["users"][0]["password"]
        .as_str()
        .context("missing digest")?;
    assert_ne!(digest, "secret");
    assert!(digest.starts_with("$argon2id$"));

    Ok(())
}

#[tokio::test]
async fn password_mismatch_is_bad_request() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .register(registration_form("alice", "secret", "secret2"))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "passwords do not match");

    assert!(!server.dir.path().join("users.json").exists());

    Ok(())
}

#[tokio::test]
async fn missing_field_is_bad_request() -> Result<()> {
    let server = TestServer::start().await?;

    let form = Form::new()
        .text("username", "alice")
        .text("password", "secret")
        .text("password_repeat", "secret");
    let response = server.register(form).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Missing field: email");

    Ok(())
}

#[tokio::test]
async fn avatar_upload_is_stored_and_served() -> Result<()> {
    let server = TestServer::start().await?;

    let bytes = b"GIF89a-not-really".to_vec();
    let form = registration_form("alice", "secret", "secret").part(
        "avatar",
        Part::bytes(bytes.clone())
            .file_name("../../Me.GIF")
            .mime_str("image/gif")?,
    );
    let response = server.register(form).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile: Profile = response.json().await?;

    let stored = profile
        .avatar_url
        .strip_prefix("/static/avatars/")
        .context("unexpected avatar url")?;
    assert!(stored.ends_with(".gif"));
    assert!(server.dir.path().join("avatars").join(stored).is_file());

    let served = server.client.get(server.url(&profile.avatar_url)).send().await?;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.bytes().await?.to_vec(), bytes);

    Ok(())
}

#[tokio::test]
async fn disallowed_avatar_uses_default() -> Result<()> {
    let server = TestServer::start().await?;

    let form = registration_form("alice", "secret", "secret").part(
        "avatar",
        Part::bytes(b"MZ".to_vec()).file_name("virus.exe"),
    );
    let response = server.register(form).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile: Profile = response.json().await?;
    assert_eq!(profile.avatar_url, "/static/avatars/default.png");

    Ok(())
}

#[tokio::test]
async fn oversized_upload_is_rejected() -> Result<()> {
    let server = TestServer::start_with_limit(1024).await?;

    let form = registration_form("alice", "secret", "secret").part(
        "avatar",
        Part::bytes(vec![0u8; 4096]).file_name("big.png"),
    );
    let response = server.register(form).await?;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!server.dir.path().join("users.json").exists());

    Ok(())
}

#[tokio::test]
async fn profile_lookup() -> Result<()> {
    let server = TestServer::start().await?;

    server
        .register(registration_form("alice", "secret", "secret"))
        .await?;

    let response = server.client.get(server.url("/profile/alice")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password").is_none());

    let response = server.client.get(server.url("/profile/bob")).send().await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn health_reports_store_status() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .client
        .get(server.url("/health"))
        .header("x-request-id", "test-request")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("test-request")
    );
    let body: Value = response.json().await?;
    assert_eq!(body["name"], "signet");
    assert_eq!(body["store"], "ok");

    std::fs::write(server.dir.path().join("users.json"), "garbage")?;
    let response = server.client.get(server.url("/health")).send().await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await?;
    assert_eq!(body["store"], "error");

    Ok(())
}

#[tokio::test]
async fn request_id_is_generated_when_absent() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server.client.get(server.url("/health")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .context("missing x-request-id")?;
    assert!(Ulid::from_string(request_id).is_ok());

    Ok(())
}

#[tokio::test]
async fn register_rejects_non_multipart_body_as_json() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .client
        .post(server.url("/register"))
        .form(&[
            ("username", "alice"),
            ("password", "secret"),
            ("password_repeat", "secret"),
        ])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("application/json"));
    let body: Value = response.json().await?;
    assert!(body["error"].is_string());
    assert!(!server.dir.path().join("users.json").exists());

    Ok(())
}

#[tokio::test]
async fn oversized_login_is_rejected() -> Result<()> {
    let server = TestServer::start_with_limit(1024).await?;

    let response = server.login("alice", &"x".repeat(4096)).await?;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json().await?;
    assert!(body["error"].is_string());

    Ok(())
}

#[tokio::test]
async fn login_without_form_is_json_error() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .client
        .post(server.url("/login"))
        .body("username=alice")
        .send()
        .await?;
    assert!(response.status().is_client_error());
    let body: Value = response.json().await?;
    assert!(body["error"].is_string());

    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .client
        .get(server.url("/api-docs/openapi.json"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let doc: Value = response.json().await?;
    assert!(doc["paths"]["/register"].is_object());
    assert!(doc["paths"]["/login"].is_object());

    Ok(())
}

#[tokio::test]
async fn concurrent_registrations_over_http() -> Result<()> {
    let server = Arc::new(TestServer::start().await?);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let server = Arc::clone(&server);
        handles.push(tokio::spawn(async move {
            server
                .register(registration_form("alice", "secret", "secret"))
                .await
                .map(|response| response.status())
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await?? {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 1);

    Ok(())
}
