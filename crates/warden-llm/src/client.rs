use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use warden_core::{ChatMessage, ProviderTag, Result, ToolCall, ToolDescriptor};

/// A request to the model backend.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub provider: ProviderTag,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub system_prompt: Option<String>,
    pub tools: Vec<ToolDescriptor>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Why the model stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Error,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A complete (non-streaming) reply.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: TokenUsage,
}

impl LlmReply {
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// A chunk of a streaming reply.
#[derive(Debug, Clone)]
pub enum LlmChunk {
    ContentDelta(String),
    ToolCallDelta(ToolCall),
    Done(FinishReason),
}

/// The opaque model service the execution engine talks to.
///
/// `send_message` is the tool-using path; `send_message_stream` carries the
/// same semantics chunked, and is used when tools are absent.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn send_message(&self, request: &LlmRequest) -> Result<LlmReply>;

    async fn send_message_stream(&self, request: &LlmRequest)
        -> Result<mpsc::Receiver<LlmChunk>>;
}
