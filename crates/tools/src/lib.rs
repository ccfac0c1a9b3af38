//! Tool invocation gateway.
//!
//! A [`ToolFunction`] is anything the model may call by name. Tools are
//! registered once at startup in a [`ToolRegistry`], which hands each
//! assistant a read-only [`ToolSet`] to look calls up in.

pub mod builtin;
pub mod function;
pub mod registry;
pub mod ui_link;

pub use function::{ToolError, ToolFunction, ToolInvocation};
pub use registry::{ToolRegistry, ToolSet};
pub use ui_link::{ToolUiEvent, ToolUiLink};
