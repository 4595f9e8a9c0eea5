//! Session orchestration: configuration, the channel abstraction, and the
//! task-to-command loop tying the generator and the safety gate together.

pub mod channel;
pub mod config;
pub mod error;
pub mod session;

pub use channel::{Channel, ChannelError, ChannelMessage};
pub use config::{AgentConfig, Config, LlmConfig, LogConfig, ProviderKind};
pub use error::SessionError;
pub use session::Session;
