use crate::channel::ChannelError;
use nlsh_llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("command generation failed: {0}")]
    Generator(#[from] LlmError),

    /// The model produced no usable command for the task.
    #[error("no command could be derived from the response")]
    EmptyProposal,

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}
