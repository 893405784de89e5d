//! Shared transcript of the reply streamed so far.

use std::sync::{Arc, Mutex};

/// Append-only accumulator shared between the frame loop and the edit
/// throttler.
///
/// Writers only append, so any snapshot is a prefix of every later
/// snapshot. The throttler may flush text that is stale by a few deltas
/// but never text the stream did not produce.
///
/// Lock discipline: the mutex is only held for a push or a clone, never
/// across an await point.
#[derive(Clone, Default)]
pub struct TranscriptBuffer {
    text: Arc<Mutex<String>>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta to the transcript.
    pub fn append(&self, delta: &str) {
        self.text
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_str(delta);
    }

    /// Copy of the full text accumulated so far.
    pub fn snapshot(&self) -> String {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    /// Length in bytes of the text so far.
    pub fn len(&self) -> usize {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
