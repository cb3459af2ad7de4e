//! CLI integration tests against a mock API.

mod common;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{login, run_cli_with_env, run_cli_with_env_success, session_file, stored_session};

fn base_url(server: &MockServer) -> String {
    format!("http://127.0.0.1:{}", server.address().port())
}

#[tokio::test]
async fn test_login_stores_private_session_file() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    login(home.path(), &base_url(&server), "access-1", "refresh-1").await;

    let stored = stored_session(home.path()).expect("session file");
    assert_eq!(stored["access_token"], "access-1");
    assert_eq!(stored["refresh_token"], "refresh-1");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(session_file(home.path()))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let stdout = run_cli_with_env_success(&["auth", "status"], home.path(), &base_url(&server)).await;
    assert!(stdout.contains("127.0.0.1"));
    assert!(stdout.contains("valid"));
    assert!(!stdout.contains("access-1"));
}

#[tokio::test]
async fn test_request_with_auth_prints_json() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "alice" })))
        .expect(1)
        .mount(&server)
        .await;

    login(home.path(), &base_url(&server), "access-1", "refresh-1").await;
    let stdout =
        run_cli_with_env_success(&["request", "get", "me", "--auth"], home.path(), &base_url(&server))
            .await;

    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body, json!({ "name": "alice" }));
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_and_saved() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/notes"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "expired" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/notes"))
        .and(header("authorization", "Bearer new-access"))
        .and(body_json(json!({ "text": "hi" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "refresh-2",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    login(home.path(), &base_url(&server), "old-access", "refresh-1").await;
    let stdout = run_cli_with_env_success(
        &["request", "post", "notes", "--auth", "--data", r#"{"text":"hi"}"#],
        home.path(),
        &base_url(&server),
    )
    .await;
    assert!(stdout.contains("\"id\": 1"));

    let stored = stored_session(home.path()).expect("session file");
    assert_eq!(stored["access_token"], "new-access");
    assert_eq!(stored["refresh_token"], "refresh-2");
    assert!(stored["expires_at"].is_string());
}

#[tokio::test]
async fn test_failed_refresh_clears_session() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "expired" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "revoked" })))
        .expect(1)
        .mount(&server)
        .await;

    login(home.path(), &base_url(&server), "access-1", "refresh-1").await;
    let output =
        run_cli_with_env(&["request", "get", "me", "--auth"], home.path(), &base_url(&server)).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Session expired"), "stderr: {stderr}");
    assert!(!session_file(home.path()).exists());
}

#[tokio::test]
async fn test_validation_error_message_is_reported() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "invalid",
            "errors": { "first_name": ["required"] }
        })))
        .mount(&server)
        .await;

    let output = run_cli_with_env(
        &["request", "post", "users", "--data", "{}"],
        home.path(),
        &base_url(&server),
    )
    .await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("required"), "stderr: {stderr}");
}

#[tokio::test]
async fn test_upload_file() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    let file = home.path().join("report.csv");
    std::fs::write(&file, "a,b\n1,2\n").unwrap();

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_string_contains(r#"name="report"; filename="report.csv""#))
        .and(body_string_contains("a,b"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "stored": true })))
        .expect(1)
        .mount(&server)
        .await;

    let stdout = run_cli_with_env_success(
        &[
            "upload",
            "files",
            file.to_str().unwrap(),
            "--mime-type",
            "text/csv",
        ],
        home.path(),
        &base_url(&server),
    )
    .await;

    assert!(stdout.contains("\"stored\": true"));
}

#[tokio::test]
async fn test_empty_response_prints_note() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("DELETE"))
        .and(path("/notes/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let output =
        run_cli_with_env(&["request", "delete", "notes/1"], home.path(), &base_url(&server)).await;

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No content"));
}

#[tokio::test]
async fn test_login_rejects_out_of_range_lifetime() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    let output = run_cli_with_env(
        &[
            "auth",
            "login",
            "--access-token",
            "access-1",
            "--refresh-token",
            "refresh-1",
            "--expires-in",
            "9223372036854775807",
        ],
        home.path(),
        &base_url(&server),
    )
    .await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("out of range"), "stderr: {stderr}");
    assert!(!stderr.contains("panicked"));
    assert!(!session_file(home.path()).exists());
}

#[tokio::test]
async fn test_invalid_header_is_rejected_before_sending() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run_cli_with_env(
        &["request", "get", "status", "-H", "Bad Name: v"],
        home.path(),
        &base_url(&server),
    )
    .await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid header"), "stderr: {stderr}");
}

#[tokio::test]
async fn test_logout_removes_session() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    login(home.path(), &base_url(&server), "access-1", "refresh-1").await;
    assert!(session_file(home.path()).exists());

    let stdout = run_cli_with_env_success(&["auth", "logout"], home.path(), &base_url(&server)).await;
    assert!(stdout.contains("Logged out"));
    assert!(!session_file(home.path()).exists());
}

#[tokio::test]
async fn test_protected_request_without_login_fails() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    let output =
        run_cli_with_env(&["request", "get", "me", "--auth"], home.path(), &base_url(&server)).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no credential configured"), "stderr: {stderr}");
}
