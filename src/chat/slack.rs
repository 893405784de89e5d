//! Slack Web API client: `chat.postMessage` and `chat.update`.
//!
//! Slack reports most failures as HTTP 200 with `ok: false` and a string
//! error code in the body, so classification looks at both the HTTP status
//! and the code.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::chat::{ChatSurface, MessageRef};
use crate::config::SlackConfig;
use crate::error::ChatError;
use crate::util::truncate_body;

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Response envelope shared by `chat.postMessage` and `chat.update`.
#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    error: Option<String>,
    ts: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    thread_ts: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateMessageRequest<'a> {
    channel: &'a str,
    ts: &'a str,
    text: &'a str,
}

/// [`ChatSurface`] backed by the Slack Web API.
pub struct SlackChat {
    client: Client,
    config: SlackConfig,
    api_base: String,
}

impl SlackChat {
    pub fn new(config: SlackConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            config,
            api_base: SLACK_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API base. Used by tests to target a
    /// local server.
    #[doc(hidden)]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    async fn call<T: Serialize>(
        &self,
        method: &str,
        payload: &T,
    ) -> Result<SlackApiResponse, ChatError> {
        let url = format!("{}/{}", self.api_base, method);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.bot_token()))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<SlackApiResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let code = parsed.as_ref().and_then(|r| r.error.as_deref());
            return Err(classify_slack_error(status.as_u16(), code));
        }

        let parsed = parsed.ok_or_else(|| ChatError::InvalidResponse {
            reason: format!("{method}: unparseable body: {}", truncate_body(&body, 200)),
        })?;

        if !parsed.ok {
            return Err(classify_slack_error(
                status.as_u16(),
                parsed.error.as_deref(),
            ));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl ChatSurface for SlackChat {
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<MessageRef, ChatError> {
        let request = PostMessageRequest {
            channel,
            thread_ts,
            text,
        };

        let response = self.call("chat.postMessage", &request).await?;
        let ts = response.ts.ok_or_else(|| ChatError::InvalidResponse {
            reason: "chat.postMessage: ok response missing ts".to_string(),
        })?;

        tracing::debug!(channel, ts = %ts, "posted threaded message");
        Ok(MessageRef::new(channel, ts))
    }

    async fn update_message(&self, target: &MessageRef, text: &str) -> Result<(), ChatError> {
        // Slack rejects empty-text updates with no_text; catch it locally.
        if text.is_empty() {
            return Err(ChatError::EmptyText);
        }

        let request = UpdateMessageRequest {
            channel: &target.channel,
            ts: &target.ts,
            text,
        };

        self.call("chat.update", &request).await?;
        Ok(())
    }
}

/// Map an HTTP status plus Slack's `error` code to a [`ChatError`].
fn classify_slack_error(http_status: u16, code: Option<&str>) -> ChatError {
    if http_status == 429 {
        return ChatError::RateLimited;
    }

    match code {
        Some(
            code @ ("invalid_auth" | "token_revoked" | "token_expired" | "not_authed"
            | "account_inactive"),
        ) => ChatError::AuthFailed {
            reason: code.to_string(),
        },
        Some("ratelimited") => ChatError::RateLimited,
        Some(code) => ChatError::Rejected {
            code: code.to_string(),
        },
        None => ChatError::Rejected {
            code: format!("HTTP {http_status}"),
        },
    }
}
