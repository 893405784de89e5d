//! Fixed-interval edits of the placeholder while the reply streams.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatSurface, MessageRef};
use crate::error::ChatError;
use crate::relay::TranscriptBuffer;

/// Periodic task that edits the placeholder to the transcript so far,
/// suffixed with the progress marker.
///
/// One throttler runs per turn. The first failed edit is terminal: the
/// task records the error, cancels the turn token and exits; [`stop`]
/// surfaces the recorded error. Stopping is confirmed: `stop` awaits the
/// task, so once it returns no further edit can land.
///
/// [`stop`]: UpdateThrottler::stop
pub struct UpdateThrottler {
    cancel: CancellationToken,
    handle: JoinHandle<Option<ChatError>>,
}

impl UpdateThrottler {
    /// Spawn the edit loop. `cancel` is the turn-wide token: cancelling it
    /// stops the loop, and a failed edit cancels it for everyone else.
    pub fn spawn(
        chat: Arc<dyn ChatSurface>,
        target: MessageRef,
        transcript: TranscriptBuffer,
        marker: String,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // Skip immediate first tick

            // The transcript is append-only, so an unchanged length means
            // unchanged text.
            let mut flushed_len = 0usize;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return None,
                    _ = ticker.tick() => {}
                }

                let text = transcript.snapshot();
                if text.is_empty() || text.len() == flushed_len {
                    continue;
                }
                flushed_len = text.len();

                let preview = format!("{text} {marker}");
                if let Err(e) = chat.update_message(&target, &preview).await {
                    tracing::warn!(error = %e, ts = %target.ts, "streaming edit failed, cancelling turn");
                    token.cancel();
                    return Some(e);
                }
                tracing::trace!(bytes = text.len(), "flushed streaming edit");
            }
        });

        Self { cancel, handle }
    }

    /// Stop the loop and wait for it to finish. Returns the edit error
    /// that terminated the loop early, if any.
    pub async fn stop(self) -> Option<ChatError> {
        self.cancel.cancel();
        match self.handle.await {
            Ok(error) => error,
            Err(e) => {
                tracing::error!(error = %e, "edit throttler task failed");
                None
            }
        }
    }
}
