pub mod error;
pub mod openai;
pub mod tools;

pub use error::CompletionError;
pub use openai::{AssistantReply, ChatCompletionClient, CompletionBackend};
pub use tools::ToolDefinition;
