//! Agent system for answering movie and TV questions with tool calling.
//!
//! The [`Agent`] forwards the conversation to a [`ChatModel`], runs the tools
//! the model asks for through the tool registry, and repeats until the model
//! answers in plain text. Each agent owns one [`SessionHistory`].

mod history;
mod message;
mod model;
mod runner;

pub use history::{SessionHistory, ToolInvocation};
pub use message::{Message, Role, ToolCallRequest};
pub use model::{tool_definitions, ChatModel, ModelReply, OpenAIChatModel};
pub use runner::Agent;
