//! OpenAI-compatible streaming chat-completions client.
//!
//! Connects to any endpoint that implements the OpenAI Chat Completions
//! API with `stream: true`: the hosted API, proxies, or local model
//! servers speaking the same protocol. Deltas arrive as SSE `data:`
//! events and are decoded into typed [`Frame`]s.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;

use crate::config::OpenAiConfig;
use crate::error::StreamError;
use crate::llm::{ChatMessage, CompletionClient, CompletionRequest, Frame, FrameStream};
use crate::util::truncate_body;

/// Provider name constant to avoid magic strings.
const PROVIDER_NAME: &str = "openai";

/// OpenAI-compatible streaming client.
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client.
    pub fn new(config: OpenAiConfig) -> Result<Self, StreamError> {
        // Connect timeout only: an overall request timeout would cut off
        // healthy long-running streams.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StreamError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("Failed to build reqwest client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    /// Construct API URL for a given path.
    /// Uses the base_url as-is and appends `/v1/{path}`.
    /// Strips trailing `/v1` from base_url to avoid double `/v1` issues.
    fn api_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/v1").unwrap_or(base);
        format!("{}/v1/{}", base, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn stream_chat(&self, request: CompletionRequest) -> Result<FrameStream, StreamError> {
        let url = self.api_url("chat/completions");

        let body = StreamingChatRequest {
            model: self.config.model.clone(),
            messages: request.messages,
            temperature: request.temperature,
            stream: true,
        };

        tracing::debug!(url = %url, model = %body.model, "opening completion stream");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(StreamError::AuthFailed {
                    provider: PROVIDER_NAME.to_string(),
                });
            }
            if status.as_u16() == 429 {
                return Err(StreamError::RateLimited {
                    provider: PROVIDER_NAME.to_string(),
                    retry_after: None,
                });
            }
            let text = response.text().await.unwrap_or_default();
            return Err(StreamError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("HTTP {}: {}", status, truncate_body(&text, 200)),
            });
        }

        let frames = response.bytes_stream().eventsource().map(|event| {
            match event {
                Ok(event) => Ok(Frame::decode(&event.data)),
                Err(EventStreamError::Transport(e)) => Err(StreamError::Http(e)),
                // Non-UTF-8 bytes or broken SSE framing: the wire itself
                // is garbled, not just one payload.
                Err(e) => Err(StreamError::MalformedFrame {
                    reason: e.to_string(),
                }),
            }
        });

        Ok(Box::pin(frames))
    }
}

/// Chat Completions request body with streaming enabled.
#[derive(Debug, Serialize)]
struct StreamingChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}
