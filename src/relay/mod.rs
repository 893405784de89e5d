//! Turn orchestration: the transcript, the edit throttler, the stream
//! aggregator and the per-mention state machine that ties them together.

mod aggregate;
mod conversation;
mod throttle;
mod transcript;

pub use aggregate::aggregate_stream;
pub use conversation::{ConversationManager, TurnOptions, TurnRequest, FALLBACK_TEXT};
pub use throttle::UpdateThrottler;
pub use transcript::TranscriptBuffer;
