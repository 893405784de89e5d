//! Drives a completion frame stream into the transcript.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;
use crate::llm::{Frame, FrameStream};
use crate::relay::TranscriptBuffer;

/// Consume `frames` to completion, appending every delta to `transcript`.
///
/// Returns the full reply text on the terminal sentinel, or on a clean
/// end-of-stream without one. An invalid frame or transport error is
/// fatal for the turn; text accumulated before the fault stays in
/// `transcript` for the caller's failure handling.
///
/// The cancel token is checked before each frame, so an edit failure
/// elsewhere in the turn stops consumption promptly.
pub async fn aggregate_stream(
    mut frames: FrameStream,
    transcript: &TranscriptBuffer,
    cancel: &CancellationToken,
) -> Result<String, StreamError> {
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            item = frames.next() => item,
        };

        match item {
            Some(Ok(Frame::Delta(delta))) => transcript.append(&delta),
            Some(Ok(Frame::Done)) => {
                let text = transcript.snapshot();
                tracing::debug!(bytes = text.len(), "stream completed");
                return Ok(text);
            }
            Some(Ok(Frame::Invalid { reason })) => {
                return Err(StreamError::MalformedFrame { reason });
            }
            Some(Err(e)) => return Err(e),
            // Some backends close the connection without the sentinel;
            // everything received still counts as a complete reply.
            None => {
                let text = transcript.snapshot();
                tracing::debug!(bytes = text.len(), "stream ended without sentinel");
                return Ok(text);
            }
        }
    }
}
