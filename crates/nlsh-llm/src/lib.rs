//! LLM provider abstraction and command suggestion parsing.

pub mod any;
pub mod claude;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ollama;
pub mod provider;
pub mod suggest;

pub use any::AnyProvider;
pub use error::LlmError;
pub use provider::{LlmProvider, Message, Role};
pub use suggest::{Suggestion, build_messages, parse_suggestion};
