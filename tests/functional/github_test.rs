//! Functional tests for the GitHub backend against a mocked REST API

use futures::StreamExt;
use mcps::backend::github::GithubServer;
use mcps::backend::{ConnectConfig, ContextServer};
use mcps::config::Settings;
use mcps::AppError;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn github_server(mock: &MockServer) -> GithubServer {
    github_server_with_env(mock, "MCPS_TEST_GITHUB_TOKEN_UNSET")
}

fn github_server_with_env(mock: &MockServer, token_env: &str) -> GithubServer {
    let mut settings = Settings::default();
    settings.github.api_url = mock.uri();
    settings.github.token_env = token_env.to_string();
    settings.github.user_agent = "mcps-tests".to_string();
    GithubServer::new(&settings.github, &settings.receive).unwrap()
}

fn token_config() -> ConnectConfig {
    ConnectConfig::from([("token".to_string(), "ghp_test".to_string())])
}

async fn connected(mock: &MockServer) -> GithubServer {
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(header("user-agent", "mcps-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octocat"})))
        .mount(mock)
        .await;

    let server = github_server(mock);
    assert_ok!(server.connect(&token_config()).await);
    server
}

async fn mount_issues(mock: &MockServer, issues: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issues))
        .mount(mock)
        .await;
}

#[tokio::test]
async fn test_connect_without_token() {
    let mock = MockServer::start().await;
    let server = github_server(&mock);

    let err = assert_err!(server.connect(&ConnectConfig::new()).await);
    assert!(err.to_string().contains("missing github token"));
}

#[tokio::test]
async fn test_connect_reads_token_from_environment() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer ghp_from_env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octocat"})))
        .expect(1)
        .mount(&mock)
        .await;

    std::env::set_var("MCPS_TEST_GITHUB_TOKEN_FROM_ENV", "ghp_from_env");
    let server = github_server_with_env(&mock, "MCPS_TEST_GITHUB_TOKEN_FROM_ENV");

    assert_ok!(server.connect(&ConnectConfig::new()).await);
}

#[tokio::test]
async fn test_failed_reconnect_drops_session() {
    let mock = MockServer::start().await;
    let server = connected(&mock).await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer ghp_revoked"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock)
        .await;

    let revoked = ConnectConfig::from([("token".to_string(), "ghp_revoked".to_string())]);
    assert_err!(server.connect(&revoked).await);
    assert!(matches!(server.list_contexts().await, Err(AppError::NotConnected(_))));
}

#[tokio::test]
async fn test_connect_unauthorized() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
        .mount(&mock)
        .await;

    let server = github_server(&mock);
    let err = assert_err!(server.connect(&token_config()).await);
    assert!(matches!(err, AppError::Connect(_)));
    assert!(err.to_string().contains("github authentication failed"));
}

#[tokio::test]
async fn test_list_contexts() {
    let mock = MockServer::start().await;
    let server = connected(&mock).await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"full_name": "octocat/hello-world"},
            {"full_name": "octocat/spoon-knife"}
        ])))
        .mount(&mock)
        .await;

    let contexts = assert_ok!(server.list_contexts().await);
    assert_eq!(contexts, vec!["octocat/hello-world", "octocat/spoon-knife"]);
}

#[tokio::test]
async fn test_send_comments_on_latest_issue() {
    let mock = MockServer::start().await;
    let server = connected(&mock).await;
    mount_issues(&mock, json!([{"number": 42}, {"number": 7}])).await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/hello/issues/42/comments"))
        .and(body_json(json!({"body": "ping"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&mock)
        .await;

    assert_ok!(server.send_message("octo/hello", "ping").await);
}

#[tokio::test]
async fn test_send_without_issues() {
    let mock = MockServer::start().await;
    let server = connected(&mock).await;
    mount_issues(&mock, json!([])).await;

    let err = assert_err!(server.send_message("octo/hello", "ping").await);
    assert_eq!(err.to_string(), "send failed: no issues found in octo/hello");
}

#[tokio::test]
async fn test_malformed_context() {
    let mock = MockServer::start().await;
    let server = connected(&mock).await;

    let err = assert_err!(server.send_message("octo", "ping").await);
    assert!(matches!(err, AppError::MalformedContext { .. }));
    assert!(matches!(
        server.receive_message("a/b/c").await,
        Err(AppError::MalformedContext { .. })
    ));
}

#[tokio::test]
async fn test_receive_reads_latest_issue_comments() {
    let mock = MockServer::start().await;
    let server = connected(&mock).await;
    mount_issues(&mock, json!([{"number": 42}])).await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello/issues/42/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"user": {"login": "alice"}, "body": "looks good", "created_at": "2024-05-01T10:20:30Z"},
            {"user": {"login": "bob"}, "body": "merged", "created_at": "2024-05-02T08:00:00Z"}
        ])))
        .mount(&mock)
        .await;

    let stream = assert_ok!(server.receive_message("octo/hello").await);
    let messages: Vec<_> = stream.map(|m| m.unwrap()).collect().await;

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].context, "octo/hello");
    assert_eq!(messages[0].to_string(), "[2024-05-01 10:20:30 +0000 UTC] alice: looks good");
    assert_eq!(messages[1].user, "bob");
}

#[tokio::test]
async fn test_receive_without_issues_is_empty() {
    let mock = MockServer::start().await;
    let server = connected(&mock).await;
    mount_issues(&mock, json!([])).await;

    let stream = assert_ok!(server.receive_message("octo/hello").await);
    let items: Vec<_> = stream.collect().await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_receive_comment_failure_ends_with_error() {
    let mock = MockServer::start().await;
    let server = connected(&mock).await;
    mount_issues(&mock, json!([{"number": 42}])).await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello/issues/42/comments"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock)
        .await;

    let mut stream = assert_ok!(server.receive_message("octo/hello").await);
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(err.to_string().starts_with("receive failed: failed to list comments"));
    assert!(stream.next().await.is_none());
}
