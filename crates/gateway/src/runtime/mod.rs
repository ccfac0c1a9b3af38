//! Turn runtime: the chat orchestrator and what surrounds it.
//!
//! [`ChatAssistant`] drives one turn on a spawned task and streams
//! [`Frame`]s back; [`ConversationLockMap`] keeps turns on the same
//! conversation from overlapping; [`dispatch`] applies the turn's
//! completion to the conversation index.

pub mod assistant;
pub mod conversation_lock;
pub mod dispatch;
pub mod emitter;
pub mod summary;

pub use assistant::{
    ChatAssistant, ChatOptions, TurnCompletion, TurnFailure, TurnInput, TurnOutcome, TurnStream,
};
pub use conversation_lock::{ConversationBusy, ConversationLockMap};
pub use dispatch::spawn_completion_handler;
pub use emitter::{ClientGone, Emitter, Frame};
