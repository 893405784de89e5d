//! One relay turn: placeholder, history, stream, finalize or fall back.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::chat::{ChatSurface, MessageRef};
use crate::config::Config;
use crate::error::{Error, StoreError};
use crate::llm::{ChatMessage, CompletionClient, CompletionRequest};
use crate::relay::{aggregate_stream, TranscriptBuffer, UpdateThrottler};
use crate::store::ContextStore;

/// Posted in-thread when a turn fails after it became visible.
pub const FALLBACK_TEXT: &str =
    "Sorry, I could not process your request.\nhttps://status.openai.com";

/// Everything a turn needs beyond its dependencies.
#[derive(Debug, Clone)]
pub struct TurnOptions {
    /// Progress marker; also the placeholder text.
    pub cursor: String,
    /// Throttled-edit interval.
    pub update_interval: Duration,
    /// Max history turns sent per request.
    pub history_window: usize,
    /// Optional system prompt, injected per request and never persisted.
    pub system_prompt: Option<String>,
    /// Sampling temperature sent with every request.
    pub temperature: f32,
    /// TTL applied when persisting thread history.
    pub context_ttl: Duration,
}

impl TurnOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cursor: config.relay.cursor.clone(),
            update_interval: config.relay.update_interval,
            history_window: config.openai.history_window,
            system_prompt: config.openai.system_prompt.clone(),
            temperature: config.openai.temperature,
            context_ttl: config.store.context_ttl,
        }
    }
}

/// One accepted mention, extracted by the webhook.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Channel the mention arrived in.
    pub channel: String,
    /// Thread the turn belongs to (the mention's `thread_ts`, or its own
    /// `ts` for a top-level mention). Also the history key.
    pub thread_id: String,
    /// User text with the mention marker stripped.
    pub prompt: String,
}

/// Runs one turn per accepted mention:
///
/// 1. post the placeholder reply (progress marker alone),
/// 2. load thread history from the store,
/// 3. stream the completion while a throttler edits the placeholder,
/// 4. on success persist history and flush the exact final text,
/// 5. on failure settle any partial text and post the fallback notice.
pub struct ConversationManager {
    store: Arc<dyn ContextStore>,
    chat: Arc<dyn ChatSurface>,
    llm: Arc<dyn CompletionClient>,
    options: TurnOptions,
}

impl ConversationManager {
    pub fn new(
        store: Arc<dyn ContextStore>,
        chat: Arc<dyn ChatSurface>,
        llm: Arc<dyn CompletionClient>,
        options: TurnOptions,
    ) -> Self {
        Self {
            store,
            chat,
            llm,
            options,
        }
    }

    /// Run one turn to completion. Returns the final reply text.
    ///
    /// A placeholder post failure propagates directly: nothing became
    /// visible, so there is nothing to clean up. Any later failure runs
    /// the fallback path (settle partial text, post the fallback notice)
    /// before the error is returned for logging.
    pub async fn run_turn(&self, request: TurnRequest) -> Result<String, Error> {
        let target = self
            .chat
            .post_message(&request.channel, &request.thread_id, &self.options.cursor)
            .await?;

        let transcript = TranscriptBuffer::new();
        let cancel = CancellationToken::new();

        match self.drive(&request, &target, &transcript, &cancel).await {
            Ok(text) => {
                tracing::info!(
                    thread_id = %request.thread_id,
                    bytes = text.len(),
                    "turn finalized"
                );
                Ok(text)
            }
            Err(error) => {
                tracing::warn!(
                    thread_id = %request.thread_id,
                    error = %error,
                    "turn failed, posting fallback"
                );
                self.fail_turn(&request, &target, &transcript).await;
                Err(error)
            }
        }
    }

    /// The fallible middle of a turn, between the placeholder post and the
    /// terminal edit. Always stops the throttler before returning.
    async fn drive(
        &self,
        request: &TurnRequest,
        target: &MessageRef,
        transcript: &TranscriptBuffer,
        cancel: &CancellationToken,
    ) -> Result<String, Error> {
        let mut history = self.load_history(&request.thread_id).await?;

        let messages = self.build_request_messages(&history, &request.prompt);
        let completion =
            CompletionRequest::new(messages).with_temperature(self.options.temperature);
        let frames = self.llm.stream_chat(completion).await.map_err(Error::from)?;

        let throttler = UpdateThrottler::spawn(
            Arc::clone(&self.chat),
            target.clone(),
            transcript.clone(),
            self.options.cursor.clone(),
            self.options.update_interval,
            cancel.clone(),
        );

        let streamed = aggregate_stream(frames, transcript, cancel).await;

        // Stop before any terminal edit; a tick-edit failure recorded here
        // is the root cause even when it surfaced as a cancelled stream.
        let flush_error = throttler.stop().await;

        let final_text = match (streamed, flush_error) {
            (_, Some(chat_error)) => return Err(chat_error.into()),
            (Err(stream_error), None) => return Err(stream_error.into()),
            (Ok(text), None) => text,
        };

        // Persist the full untrimmed history; the window only shapes the
        // request. The user already has the answer on screen, so a write
        // failure is logged rather than failing the turn.
        history.push(ChatMessage::user(&request.prompt));
        if !final_text.is_empty() {
            history.push(ChatMessage::assistant(&final_text));
        }
        if let Err(e) = self.save_history(&request.thread_id, &history).await {
            tracing::warn!(
                thread_id = %request.thread_id,
                error = %e,
                "failed to persist thread history"
            );
        }

        if final_text.is_empty() {
            // No edit to make: platforms reject empty text, and the
            // placeholder already marks the spot.
            tracing::warn!(thread_id = %request.thread_id, "stream produced an empty reply");
        } else {
            self.chat.update_message(target, &final_text).await?;
        }

        Ok(final_text)
    }

    /// Failure tail: leave whatever streamed in place, then tell the user.
    async fn fail_turn(
        &self,
        request: &TurnRequest,
        target: &MessageRef,
        transcript: &TranscriptBuffer,
    ) {
        let partial = transcript.snapshot();
        if !partial.is_empty() {
            if let Err(e) = self.chat.update_message(target, &partial).await {
                tracing::warn!(error = %e, "could not settle partial reply text");
            }
        }

        if let Err(e) = self
            .chat
            .post_message(&request.channel, &request.thread_id, FALLBACK_TEXT)
            .await
        {
            tracing::warn!(error = %e, "could not post fallback notice");
        }
    }

    async fn load_history(&self, thread_id: &str) -> Result<Vec<ChatMessage>, Error> {
        match self.store.get(thread_id).await? {
            Some(raw) => {
                let turns: Vec<ChatMessage> = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                tracing::debug!(thread_id, turns = turns.len(), "loaded thread history");
                Ok(turns)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn save_history(&self, thread_id: &str, history: &[ChatMessage]) -> Result<(), Error> {
        let raw = serde_json::to_string(history)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store
            .put(thread_id, &raw, self.options.context_ttl)
            .await?;
        Ok(())
    }

    /// Last `history_window` turns, then the user turn; the system prompt,
    /// when configured, goes at the front of the request only.
    fn build_request_messages(&self, history: &[ChatMessage], prompt: &str) -> Vec<ChatMessage> {
        let start = history.len().saturating_sub(self.options.history_window);
        let mut messages = Vec::with_capacity(history.len() - start + 2);
        if let Some(system) = &self.options.system_prompt {
            messages.push(ChatMessage::system(system));
        }
        messages.extend_from_slice(&history[start..]);
        messages.push(ChatMessage::user(prompt));
        messages
    }
}
