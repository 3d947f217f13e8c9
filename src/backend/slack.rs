//! Slack Web API backend
//!
//! Contexts are channel names, with or without a leading `#`. The token comes
//! from the `token` connect key or the `SLACK_TOKEN` environment variable.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::traits::{credential, ConnectConfig, ContextServer, Message, MessageStream};
use crate::config::{ReceiveConfig, SlackConfig};
use crate::error::{AppError, Result};

const CHANNEL_TYPES: &str = "public_channel,private_channel";
const CHANNEL_LIMIT: u32 = 1000;

/// Slack workspace exposed as a set of channel contexts
pub struct SlackServer {
    client: Client,
    api_url: String,
    token_env: String,
    history_limit: u32,
    buffer_size: usize,
    session: RwLock<Option<Arc<SlackSession>>>,
}

/// Credentials of the last successful connect
struct SlackSession {
    token: String,
}

/// Status fields present on every Web API reply
#[derive(Debug, Deserialize)]
struct ApiStatus {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

trait ApiReply {
    fn status(&self) -> &ApiStatus;
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(default)]
    user: String,
}

#[derive(Debug, Deserialize)]
struct ConversationsListResponse {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(default)]
    channels: Vec<ApiChannel>,
}

#[derive(Debug, Deserialize)]
struct ApiChannel {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(default)]
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    ts: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    #[serde(flatten)]
    status: ApiStatus,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

macro_rules! impl_api_reply {
    ($($ty:ty),*) => {
        $(impl ApiReply for $ty {
            fn status(&self) -> &ApiStatus {
                &self.status
            }
        })*
    };
}

impl_api_reply!(AuthTestResponse, ConversationsListResponse, HistoryResponse, PostMessageResponse);

impl SlackServer {
    /// Create a Slack backend from configuration
    pub fn new(config: &SlackConfig, receive: &ReceiveConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token_env: config.token_env.clone(),
            history_limit: config.history_limit,
            buffer_size: receive.buffer_size,
            session: RwLock::new(None),
        })
    }

    fn session(&self) -> Result<Arc<SlackSession>> {
        self.session
            .read()
            .clone()
            .ok_or_else(|| AppError::NotConnected("slack".to_string()))
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }

    /// Send a Web API request and unwrap the `ok`/`error` envelope
    async fn call<T>(request: RequestBuilder, token: &str) -> std::result::Result<T, String>
    where
        T: DeserializeOwned + ApiReply,
    {
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;

        let reply: T = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))?;

        let status = reply.status();
        if !status.ok {
            return Err(status
                .error
                .clone()
                .unwrap_or_else(|| "unknown_error".to_string()));
        }
        Ok(reply)
    }

    async fn channels(&self, token: &str) -> std::result::Result<Vec<ApiChannel>, String> {
        let request = self
            .client
            .get(self.url("conversations.list"))
            .query(&[("types", CHANNEL_TYPES.to_string()), ("limit", CHANNEL_LIMIT.to_string())]);
        let reply: ConversationsListResponse = Self::call(request, token).await?;
        Ok(reply.channels)
    }

    /// Validate a token against `auth.test` and build the session it unlocks
    async fn authenticate(&self, config: &ConnectConfig) -> Result<Arc<SlackSession>> {
        let token = credential(config, "token", &self.token_env).ok_or_else(|| {
            AppError::Connect(format!(
                "missing slack token in config or environment ({})",
                self.token_env
            ))
        })?;

        let request = self.client.post(self.url("auth.test"));
        let reply: AuthTestResponse = Self::call(request, &token)
            .await
            .map_err(|e| AppError::Connect(format!("slack authentication failed: {}", e)))?;

        info!(user = %reply.user, "Connected to Slack");
        Ok(Arc::new(SlackSession { token }))
    }

    /// Map a channel name to its id
    async fn resolve_channel_id(&self, token: &str, channel: &str) -> std::result::Result<String, String> {
        self.channels(token)
            .await?
            .into_iter()
            .find(|c| c.name == channel)
            .map(|c| c.id)
            .ok_or_else(|| format!("channel {} not found", channel))
    }
}

/// Strip the optional `#` from a channel context
fn channel_name(context: &str) -> Result<&str> {
    let name = context.strip_prefix('#').unwrap_or(context);
    if name.is_empty() {
        return Err(AppError::malformed(context, "channel name cannot be empty"));
    }
    Ok(name)
}

#[async_trait]
impl ContextServer for SlackServer {
    fn name(&self) -> &str {
        "slack"
    }

    async fn connect(&self, config: &ConnectConfig) -> Result<()> {
        // Replaced only once the check settles; in-flight operations hold their own Arc
        let outcome = self.authenticate(config).await;
        *self.session.write() = outcome.as_ref().ok().cloned();
        outcome.map(|_| ())
    }

    async fn list_contexts(&self) -> Result<Vec<String>> {
        let session = self.session()?;
        let channels = self.channels(&session.token).await.map_err(AppError::List)?;
        Ok(channels.into_iter().map(|c| format!("#{}", c.name)).collect())
    }

    async fn send_message(&self, context: &str, text: &str) -> Result<()> {
        let session = self.session()?;
        let channel = channel_name(context)?;
        let channel_id = self
            .resolve_channel_id(&session.token, channel)
            .await
            .map_err(AppError::Send)?;

        let request = self
            .client
            .post(self.url("chat.postMessage"))
            .json(&PostMessageRequest { channel: &channel_id, text });
        let _: PostMessageResponse = Self::call(request, &session.token)
            .await
            .map_err(|e| AppError::Send(format!("failed to send message: {}", e)))?;

        info!(context = %context, "Sent message to Slack");
        Ok(())
    }

    async fn receive_message(&self, context: &str) -> Result<MessageStream> {
        let session = self.session()?;
        let channel = channel_name(context)?;
        let channel_id = self
            .resolve_channel_id(&session.token, channel)
            .await
            .map_err(AppError::Receive)?;

        // Polls the history once; a live subscription is out of scope
        let request = self
            .client
            .get(self.url("conversations.history"))
            .query(&[("channel", channel_id), ("limit", self.history_limit.to_string())]);
        let context = context.to_string();

        Ok(MessageStream::spawn(self.buffer_size, move |sink| async move {
            let history: HistoryResponse = match Self::call(request, &session.token).await {
                Ok(history) => history,
                Err(e) => {
                    warn!(context = %context, error = %e, "Slack history fetch failed");
                    sink.fail(AppError::Receive(format!("failed to fetch history: {}", e)))
                        .await;
                    return;
                }
            };

            for message in history.messages {
                let message = Message {
                    context: context.clone(),
                    user: message.user.or(message.username).unwrap_or_default(),
                    text: message.text,
                    time: message.ts,
                };
                if !sink.emit(message).await {
                    debug!(context = %context, "Receive consumer went away");
                    return;
                }
            }
        }))
    }
}
