//! Typed decoding of completion stream frames.
//!
//! Every SSE `data:` payload decodes to exactly one [`Frame`]; the
//! decoder is total. Escalation is the consumer's job: the turn loop
//! treats `Invalid` as fatal rather than skipping it, so a garbled wire
//! never silently loses reply text.

use serde::Deserialize;

/// Sentinel payload that terminates the stream.
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded frame from the completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A content increment. Empty for role preludes and finish chunks,
    /// which carry no text.
    Delta(String),
    /// Terminal sentinel; the reply is complete.
    Done,
    /// Payload that is neither a delta chunk nor the sentinel.
    Invalid { reason: String },
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

impl Frame {
    /// Decode one SSE `data:` payload.
    pub fn decode(payload: &str) -> Frame {
        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return Frame::Done;
        }
        match serde_json::from_str::<StreamChunk>(payload) {
            Ok(chunk) => match chunk.choices.into_iter().next() {
                Some(choice) => Frame::Delta(choice.delta.content.unwrap_or_default()),
                None => Frame::Invalid {
                    reason: "no choices in chunk".to_string(),
                },
            },
            Err(e) => Frame::Invalid {
                reason: e.to_string(),
            },
        }
    }
}
