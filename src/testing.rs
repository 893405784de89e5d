//! Test doubles shared by unit tests across the crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;

use crate::chat::{ChatSurface, MessageRef};
use crate::error::{ChatError, StoreError, StreamError};
use crate::llm::{CompletionClient, CompletionRequest, Frame, FrameStream};
use crate::store::{ContextStore, MemoryStore};

/// Chat surface that records every call and can be told to fail.
///
/// Successful posts are assigned increasing timestamps in the platform's
/// `seconds.fraction` shape. Failed calls are counted but not recorded.
#[derive(Default)]
pub struct StubChat {
    posts: Mutex<Vec<(String, String, String)>>,
    updates: Mutex<Vec<(MessageRef, String)>>,
    post_attempts: AtomicUsize,
    update_attempts: AtomicUsize,
    fail_posts: AtomicBool,
    fail_updates: AtomicBool,
    next_ts: AtomicU64,
}

impl StubChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_post_failing(&self, failing: bool) {
        self.fail_posts.store(failing, Ordering::SeqCst);
    }

    pub fn set_update_failing(&self, failing: bool) {
        self.fail_updates.store(failing, Ordering::SeqCst);
    }

    /// Successful posts as `(channel, thread_ts, text)`.
    pub fn posts(&self) -> Vec<(String, String, String)> {
        self.posts.lock().unwrap().clone()
    }

    /// Texts of successful updates, in order.
    pub fn update_texts(&self) -> Vec<String> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Successful updates as `(target, text)`.
    pub fn updates(&self) -> Vec<(MessageRef, String)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn post_attempts(&self) -> usize {
        self.post_attempts.load(Ordering::SeqCst)
    }

    pub fn update_attempts(&self) -> usize {
        self.update_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatSurface for StubChat {
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<MessageRef, ChatError> {
        self.post_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(ChatError::Rejected {
                code: "stub_post_failure".to_string(),
            });
        }

        let seq = self.next_ts.fetch_add(1, Ordering::SeqCst) + 1;
        let ts = format!("1700000000.{:06}", seq * 100);
        self.posts
            .lock()
            .unwrap()
            .push((channel.to_string(), thread_ts.to_string(), text.to_string()));
        Ok(MessageRef::new(channel, ts))
    }

    async fn update_message(&self, target: &MessageRef, text: &str) -> Result<(), ChatError> {
        self.update_attempts.fetch_add(1, Ordering::SeqCst);
        // Mirror the real surface's refusal so tests catch empty flushes.
        if text.is_empty() {
            return Err(ChatError::EmptyText);
        }
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ChatError::Rejected {
                code: "stub_update_failure".to_string(),
            });
        }

        self.updates
            .lock()
            .unwrap()
            .push((target.clone(), text.to_string()));
        Ok(())
    }
}

enum Script {
    Frames(Vec<Result<Frame, StreamError>>),
    Stream(FrameStream),
    OpenError(StreamError),
}

/// Completion client that replays scripted streams and captures requests.
///
/// Each `stream_chat` call consumes the next pushed script; with no script
/// queued it answers an empty stream.
#[derive(Default)]
pub struct StubCompletion {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frames(&self, frames: Vec<Result<Frame, StreamError>>) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Frames(frames));
    }

    pub fn push_stream(&self, stream: FrameStream) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Stream(stream));
    }

    pub fn push_open_error(&self, error: StreamError) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::OpenError(error));
    }

    /// Requests captured so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    async fn stream_chat(&self, request: CompletionRequest) -> Result<FrameStream, StreamError> {
        self.requests.lock().unwrap().push(request);
        match self.scripts.lock().unwrap().pop_front() {
            Some(Script::Frames(frames)) => Ok(Box::pin(stream::iter(frames))),
            Some(Script::Stream(frames)) => Ok(frames),
            Some(Script::OpenError(error)) => Err(error),
            None => Ok(Box::pin(stream::empty())),
        }
    }
}

/// Store whose reads or writes fail on demand; everything else delegates
/// to an in-memory store.
pub struct FailingStore {
    inner: MemoryStore,
    fail_gets: bool,
    fail_puts: bool,
}

impl FailingStore {
    /// Both reads and writes fail.
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_gets: true,
            fail_puts: true,
        }
    }

    /// Reads succeed, writes fail.
    pub fn failing_writes() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_gets: false,
            fail_puts: true,
        }
    }
}

impl Default for FailingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_gets {
            return Err(StoreError::Unavailable {
                reason: "stub store offline".to_string(),
            });
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        if self.fail_puts {
            return Err(StoreError::Unavailable {
                reason: "stub store offline".to_string(),
            });
        }
        self.inner.put(key, value, ttl).await
    }
}
