//! History preparation: rebuilding the active thread from the message
//! tree, fitting it into the model's token budget, and converting it to
//! provider-agnostic model input.

pub mod budget;
pub mod convert;
pub mod crop;
pub mod thread;
pub mod tokenizer;

pub use budget::{limit_messages, Trimmed};
pub use convert::to_prompt_messages;
pub use thread::{build_thread, latest_message, ThreadError};
pub use tokenizer::{HeuristicTokenizer, Tokenizer};
