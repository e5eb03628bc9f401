// Chat side - what the relay needs from the workspace connection
// Slack specifics (socket mode envelopes, web api) live in slack.rs

pub mod slack;

pub use slack::SlackClient;

use async_trait::async_trait;
use thiserror::Error;

/// How a message reached the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageContext {
    DirectMessage,
    DirectMention,
    Ambient,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub channel: String,
    pub user: Option<String>,
    pub text: String,
    pub context: MessageContext,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    ConnectionOpened,
    ConnectionClosed { reason: String },
    ChannelJoined { channel: String },
    Message(IncomingMessage),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat api error: {0}")]
    Api(String),

    #[error("chat socket error: {0}")]
    Socket(String),
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;

#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send(&self, channel: &str, text: &str) -> ChatResult<()>;

    /// Answer in the conversation the message came from
    async fn reply(&self, message: &IncomingMessage, text: &str) -> ChatResult<()> {
        self.send(&message.channel, text).await
    }
}
