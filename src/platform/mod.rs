pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

use crate::formatter::{InlineSuggestion, Payload};

/// Chat a response is delivered to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatTarget(pub i64);

impl std::fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A command received from any platform
#[derive(Debug, Clone)]
pub struct CommandEvent {
    /// Command name without the leading slash or bot mention
    pub name: String,
    pub target: ChatTarget,
    /// Platform-specific user ID as string
    pub requester_id: String,
    /// The full message text
    pub raw: String,
}

/// A free-text search typed into the chat input box
#[derive(Debug, Clone)]
pub struct InlineQueryEvent {
    pub query_text: String,
    pub requester_id: String,
}

/// Outbound side of a chat platform
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Deliver payloads to one chat, in order
    async fn send(&self, target: ChatTarget, payloads: Vec<Payload>) -> Result<()>;
}

/// Reply handle bound to one inbound inline query
#[async_trait]
pub trait InlineResponder: Send + Sync {
    async fn answer(&self, suggestions: Vec<InlineSuggestion>) -> Result<()>;
}
