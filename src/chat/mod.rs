//! Chat surface abstraction.
//!
//! A turn talks to the chat platform through [`ChatSurface`]: post one
//! threaded placeholder, then edit it in place as the reply streams in.
//! The Slack Web API implementation lives in [`slack`]; tests substitute
//! stubs.

use async_trait::async_trait;

use crate::error::ChatError;

mod slack;

pub use slack::SlackChat;

/// Handle to a posted message, sufficient to edit it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Channel the message lives in.
    pub channel: String,
    /// Platform timestamp identifying the message within the channel.
    pub ts: String,
}

impl MessageRef {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
        }
    }
}

/// Operations a relay turn performs against the chat platform.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Post a new message as a threaded reply and return a handle to it.
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<MessageRef, ChatError>;

    /// Replace the text of a previously posted message.
    async fn update_message(&self, target: &MessageRef, text: &str) -> Result<(), ChatError>;
}
