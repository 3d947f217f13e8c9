//! Common traits and types shared by every context backend

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{AppError, Result};

/// Backend-specific connection options, e.g. `token`
pub type ConnectConfig = HashMap<String, String>;

/// One inbound message, normalized across backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Context the message was read from
    pub context: String,

    /// Author as the backend names them
    pub user: String,

    /// Message body
    pub text: String,

    /// Backend-formatted timestamp
    pub time: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.time, self.user, self.text)
    }
}

/// Trait for messaging backends addressed by context
#[async_trait]
pub trait ContextServer: Send + Sync {
    /// Registry key, constant for the lifetime of the instance
    fn name(&self) -> &str;

    /// Validate credentials and make the backend ready.
    ///
    /// Recognised config keys are backend-specific; a missing or empty key
    /// falls back to the backend's environment variable. Every call
    /// re-validates, and a failure discards any earlier session.
    async fn connect(&self, config: &ConnectConfig) -> Result<()>;

    /// Contexts visible to the connected identity, in backend order
    async fn list_contexts(&self) -> Result<Vec<String>>;

    /// Deliver `text` into `context`
    async fn send_message(&self, context: &str, text: &str) -> Result<()>;

    /// Start a one-shot read of `context`.
    ///
    /// Errors returned here are setup failures. Failures while the stream is
    /// being filled arrive as a final `Err` item.
    async fn receive_message(&self, context: &str) -> Result<MessageStream>;
}

/// Pick a credential from the config map, falling back to the environment
pub fn credential(config: &ConnectConfig, key: &str, env_var: &str) -> Option<String> {
    config
        .get(key)
        .filter(|value| !value.is_empty())
        .cloned()
        .or_else(|| std::env::var(env_var).ok().filter(|value| !value.is_empty()))
}

/// Finite, non-restartable stream of received messages.
///
/// Backed by a bounded channel. Dropping the stream makes the producer's
/// next send fail, which ends the producing task.
pub struct MessageStream {
    rx: mpsc::Receiver<Result<Message>>,
}

impl MessageStream {
    /// A stream that is already closed
    pub fn empty() -> Self {
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        Self { rx }
    }

    /// A stream over an in-memory snapshot
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let (tx, rx) = mpsc::channel(messages.len().max(1));
        for message in messages {
            // Capacity matches the snapshot, so this never hits a full channel
            if tx.try_send(Ok(message)).is_err() {
                break;
            }
        }
        Self { rx }
    }

    /// Spawn `produce` on the runtime and return the stream it feeds
    pub fn spawn<F, Fut>(capacity: usize, produce: F) -> Self
    where
        F: FnOnce(MessageSink) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sink, stream) = message_channel(capacity);
        tokio::spawn(produce(sink));
        stream
    }

    /// Receive the next item, `None` once the producer has finished
    pub async fn recv(&mut self) -> Option<Result<Message>> {
        self.rx.recv().await
    }
}

impl Stream for MessageStream {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Producer half of a [`MessageStream`]
#[derive(Clone)]
pub struct MessageSink {
    tx: mpsc::Sender<Result<Message>>,
}

impl MessageSink {
    /// Push one message; `false` means the consumer has gone away
    pub async fn emit(&self, message: Message) -> bool {
        self.tx.send(Ok(message)).await.is_ok()
    }

    /// Push a terminal error and close this producer
    pub async fn fail(self, error: AppError) {
        if let Err(mpsc::error::SendError(Err(error))) = self.tx.send(Err(error)).await {
            debug!(error = %error, "Receive consumer dropped before error delivery");
        }
    }
}

/// Create a connected sink/stream pair with the given buffer
pub fn message_channel(capacity: usize) -> (MessageSink, MessageStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MessageSink { tx }, MessageStream { rx })
}
