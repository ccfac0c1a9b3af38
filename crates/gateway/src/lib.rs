//! HTTP front end and process wiring for the chat engine.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
