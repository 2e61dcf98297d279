use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use orderdesk_core::errors::ApplicationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// A function the model may call, described by a JSON schema.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSchema>,
}

/// A raw tool invocation as the model sent it. `arguments` is the undecoded
/// JSON text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCompletion {
    Text(String),
    ToolCalls(Vec<ToolInvocation>),
    Empty,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm api key is not configured")]
    MissingCredential,
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm endpoint returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode llm response: {0}")]
    Decode(String),
}

impl From<LlmError> for ApplicationError {
    fn from(value: LlmError) -> Self {
        ApplicationError::ProviderUnavailable(value.to_string())
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, LlmError>;
}
