//! At-most-once webhook intake, keyed on the platform's per-message id.
//!
//! Event deliveries are at-least-once: the platform retries whenever it
//! is unhappy with a response, and a retry must not start a second turn
//! for the same message. The guard claims a message id by writing a
//! marker through the context store; a marker already present means an
//! earlier delivery won.

use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::store::ContextStore;

/// Outcome of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// First delivery of this message id; the caller owns the turn.
    Fresh,
    /// Already claimed within the TTL; drop the delivery.
    Duplicate,
}

/// Check-then-claim guard over the context store.
///
/// The get/put pair is not atomic: two deliveries racing inside that
/// window can both claim `Fresh`. Platform retries arrive seconds apart,
/// far wider than the window, so the race is accepted. A real fix is a
/// conditional write at the store layer, not a change to `claim`.
pub struct DedupGuard {
    store: Arc<dyn ContextStore>,
    ttl: Duration,
}

impl DedupGuard {
    pub fn new(store: Arc<dyn ContextStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Claim `token`, recording `payload` as the marker value.
    ///
    /// Store failure on either step propagates; the caller must not
    /// assume the claim landed.
    pub async fn claim(&self, token: &str, payload: &str) -> Result<Claim, StoreError> {
        if self.store.get(token).await?.is_some() {
            return Ok(Claim::Duplicate);
        }
        self.store.put(token, payload, self.ttl).await?;
        Ok(Claim::Fresh)
    }
}
