//! TTL'd key-value persistence for conversation context.
//!
//! Conversation history and dedup markers share one store: opaque string
//! keys to opaque string values, each with its own expiry. Absent and
//! expired keys are indistinguishable to callers; both read back as
//! `Ok(None)`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

mod memory;
pub use self::memory::MemoryStore;

#[cfg(feature = "libsql")]
mod libsql;
#[cfg(feature = "libsql")]
pub use self::libsql::LibSqlStore;

/// Key-value persistence with per-entry TTL.
///
/// A value written with TTL `t` is readable strictly before `t` elapses
/// and reads back as `None` at or after expiry. `put` is an unconditional
/// upsert: it overwrites an existing value and resets its expiry.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Fetch the value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite `key`, with expiry `ttl` from now.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}
