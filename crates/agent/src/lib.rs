//! Conversation runtime for the ordering assistant.
//!
//! A turn flows through three layers:
//! 1. `conversation` assembles the prompt (system context, order snapshot,
//!    user text) and asks the `llm` client for one completion.
//! 2. `dispatcher` turns that completion into a reply, applying at most one
//!    order tool call along the way.
//! 3. `runtime` owns the per-session category gate and lock, and converts
//!    every failure into conversational text.
//!
//! The model only translates requests into `add_to_order` / `remove_from_order`
//! calls. Quantities, product membership and confirmations are decided locally.

pub mod conversation;
pub mod dispatcher;
pub mod llm;
pub mod openai;
pub mod runtime;
pub mod tools;

pub use conversation::ConversationDriver;
pub use dispatcher::ToolCallDispatcher;
pub use llm::{
    ChatCompletion, ChatMessage, ChatRequest, ChatRole, LlmClient, LlmError, ToolInvocation,
};
pub use openai::OpenAiClient;
pub use runtime::{AssistantReply, AssistantRuntime, RuntimeSettings};
