//! GitHub issue-comment backend
//!
//! A context is an `owner/repo` pair. Sending comments on the most recent
//! issue of the repository, receiving reads that issue's comments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::traits::{credential, ConnectConfig, ContextServer, Message, MessageStream};
use crate::config::{GithubConfig, ReceiveConfig};
use crate::error::{AppError, Result};

/// GitHub account exposed as a set of repository contexts
pub struct GithubServer {
    client: Client,
    api_url: String,
    token_env: String,
    buffer_size: usize,
    session: RwLock<Option<Arc<GithubSession>>>,
}

struct GithubSession {
    token: String,
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    #[serde(default)]
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    body: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct CreateCommentRequest<'a> {
    body: &'a str,
}

/// Split an `owner/repo` context
fn parse_repo(context: &str) -> Result<(&str, &str)> {
    match context.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok((*owner, *repo)),
        _ => Err(AppError::malformed(context, "context should be in owner/repo format")),
    }
}

/// Render a timestamp as `2006-01-02 15:04:05 +0000 UTC`
fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S %z UTC").to_string()
}

impl GithubServer {
    /// Create a GitHub backend from configuration
    pub fn new(config: &GithubConfig, receive: &ReceiveConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token_env: config.token_env.clone(),
            buffer_size: receive.buffer_size,
            session: RwLock::new(None),
        })
    }

    fn session(&self) -> Result<Arc<GithubSession>> {
        self.session
            .read()
            .clone()
            .ok_or_else(|| AppError::NotConnected("github".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn fetch<T: DeserializeOwned>(
        request: RequestBuilder,
        token: &str,
    ) -> std::result::Result<T, String> {
        request
            .bearer_auth(token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))
    }

    /// Resolve the token and confirm it through `GET /user`
    async fn authenticate(&self, config: &ConnectConfig) -> Result<Arc<GithubSession>> {
        let token = credential(config, "token", &self.token_env).ok_or_else(|| {
            AppError::Connect(format!(
                "missing github token in config or environment ({})",
                self.token_env
            ))
        })?;

        let user: ApiUser = Self::fetch(self.client.get(self.url("/user")), &token)
            .await
            .map_err(|e| AppError::Connect(format!("github authentication failed: {}", e)))?;

        info!(login = %user.login, "Connected to GitHub");
        Ok(Arc::new(GithubSession {
            token,
            login: user.login,
        }))
    }

    /// Number of the most recent issue, if the repository has any
    async fn latest_issue(
        client: &Client,
        url: String,
        token: &str,
    ) -> std::result::Result<Option<u64>, String> {
        let issues: Vec<ApiIssue> = Self::fetch(client.get(url), token).await?;
        Ok(issues.first().map(|issue| issue.number))
    }
}

#[async_trait]
impl ContextServer for GithubServer {
    fn name(&self) -> &str {
        "github"
    }

    async fn connect(&self, config: &ConnectConfig) -> Result<()> {
        let outcome = self.authenticate(config).await;
        *self.session.write() = outcome.as_ref().ok().cloned();
        outcome.map(|_| ())
    }

    async fn list_contexts(&self) -> Result<Vec<String>> {
        let session = self.session()?;
        let repos: Vec<ApiRepository> =
            Self::fetch(self.client.get(self.url("/user/repos")), &session.token)
                .await
                .map_err(AppError::List)?;

        debug!(login = %session.login, count = repos.len(), "Listed GitHub repositories");
        Ok(repos.into_iter().map(|r| r.full_name).collect())
    }

    async fn send_message(&self, context: &str, text: &str) -> Result<()> {
        let session = self.session()?;
        let (owner, repo) = parse_repo(context)?;

        let issues_url = self.url(&format!("/repos/{}/{}/issues", owner, repo));
        let number = Self::latest_issue(&self.client, issues_url, &session.token)
            .await
            .map_err(|e| AppError::Send(format!("no issues found in {}: {}", context, e)))?
            .ok_or_else(|| AppError::Send(format!("no issues found in {}", context)))?;

        let comments_url = self.url(&format!("/repos/{}/{}/issues/{}/comments", owner, repo, number));
        let request = self
            .client
            .post(comments_url)
            .json(&CreateCommentRequest { body: text });
        let _: serde_json::Value = Self::fetch(request, &session.token)
            .await
            .map_err(|e| AppError::Send(format!("failed to send message as comment: {}", e)))?;

        info!(context = %context, issue = number, "Sent message to GitHub");
        Ok(())
    }

    async fn receive_message(&self, context: &str) -> Result<MessageStream> {
        let session = self.session()?;
        let (owner, repo) = parse_repo(context)?;

        let client = self.client.clone();
        let issues_url = self.url(&format!("/repos/{}/{}/issues", owner, repo));
        let comments_base = issues_url.clone();
        let context = context.to_string();

        Ok(MessageStream::spawn(self.buffer_size, move |sink| async move {
            let number = match Self::latest_issue(&client, issues_url, &session.token).await {
                Ok(Some(number)) => number,
                // No issue means nothing to read
                Ok(None) => return,
                Err(e) => {
                    warn!(context = %context, error = %e, "GitHub issue lookup failed");
                    sink.fail(AppError::Receive(format!("failed to list issues: {}", e)))
                        .await;
                    return;
                }
            };

            let url = format!("{}/{}/comments", comments_base, number);
            let comments: Vec<ApiComment> = match Self::fetch(client.get(url), &session.token).await {
                Ok(comments) => comments,
                Err(e) => {
                    warn!(context = %context, error = %e, "GitHub comment fetch failed");
                    sink.fail(AppError::Receive(format!("failed to list comments: {}", e)))
                        .await;
                    return;
                }
            };

            for comment in comments {
                let message = Message {
                    context: context.clone(),
                    user: comment.user.map(|u| u.login).unwrap_or_default(),
                    text: comment.body.unwrap_or_default(),
                    time: format_time(&comment.created_at),
                };
                if !sink.emit(message).await {
                    debug!(context = %context, "Receive consumer went away");
                    return;
                }
            }
        }))
    }
}
