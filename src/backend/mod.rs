//! Backend module - Context contract, registry, and the Slack/GitHub adapters

pub mod github;
pub mod registry;
pub mod slack;
pub mod traits;

pub use registry::ServerRegistry;
pub use traits::{ConnectConfig, ContextServer, Message, MessageStream};
