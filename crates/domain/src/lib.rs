//! Core types shared by every engine crate: the conversation message
//! model, the wire stream protocol, the per-turn chat state machine,
//! model-side stream events, and configuration.

pub mod chat_state;
pub mod config;
pub mod conversation;
pub mod error;
pub mod message;
pub mod prompt;
pub mod stream;
pub mod stream_part;
pub mod tool;
pub mod trace;

pub use error::{Error, Result};
