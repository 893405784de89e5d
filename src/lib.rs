//! Relay bot: chat mentions in, streamed completion replies out.
//!
//! A mention arrives over the webhook ([`server`]), is deduplicated
//! against redeliveries ([`dedup`]), and becomes one relay turn
//! ([`relay`]): a placeholder reply is posted through the chat surface
//! ([`chat`]), the completions API is streamed ([`llm`]) while the
//! placeholder is edited in place, and the finished exchange is persisted
//! as thread history ([`store`]).

pub mod chat;
pub mod config;
pub mod dedup;
pub mod error;
pub mod llm;
pub mod relay;
pub mod server;
pub mod store;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
