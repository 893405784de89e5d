//! Error types for relaybot.

use std::time::Duration;

/// Top-level error type for the relay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Context-store errors.
///
/// Backend faults are folded into `Unavailable` so callers decide on a
/// single variant whether a failed read aborts the turn or a failed write
/// is logged and swallowed. Absent and expired keys are `Ok(None)`, never
/// errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Context store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Stored value malformed: {0}")]
    Serialization(String),
}

/// Completions-stream errors, covering both opening the request and
/// consuming the event stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    /// A frame on the wire did not decode to a delta or the terminal
    /// sentinel. Always fatal for the turn; partial text up to this point
    /// stays readable through the transcript.
    #[error("Malformed stream frame: {reason}")]
    MalformedFrame { reason: String },

    #[error("Stream cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Chat-surface errors (posting and editing visible messages).
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("Rate limited by chat platform")]
    RateLimited,

    /// Platform answered `ok: false` with an error code
    /// (`channel_not_found`, `message_not_found`, `msg_too_long`, ...).
    #[error("Chat platform rejected the call: {code}")]
    Rejected { code: String },

    #[error("Refusing to send empty message text")]
    EmptyText,

    #[error("Invalid response from chat platform: {reason}")]
    InvalidResponse { reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Webhook server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Webhook server failed to start: {reason}")]
    StartupFailed { reason: String },
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
