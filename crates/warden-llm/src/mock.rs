//! Mock LLM client for deterministic testing.
//!
//! Returns pre-configured replies without making any HTTP calls, and records
//! every request it receives for assertions.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

use warden_core::{Result, ToolCall, WardenError};

use crate::client::*;

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    /// If set, the client returns this error instead.
    pub error: Option<String>,
}

impl Default for MockReply {
    fn default() -> Self {
        Self {
            text: String::new(),
            tool_calls: vec![],
            finish_reason: FinishReason::EndTurn,
            error: None,
        }
    }
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn tool_call(name: &str, args: &[(&str, &str)]) -> Self {
        Self {
            tool_calls: vec![ToolCall::new(name, args)],
            finish_reason: FinishReason::ToolUse,
            ..Default::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            finish_reason: FinishReason::ToolUse,
            ..Default::default()
        }
    }
}

/// A scripted LLM client: replies are consumed in order; when the queue is
/// empty the repeating reply (if any) is returned forever.
#[derive(Clone, Default)]
pub struct MockLlm {
    replies: Arc<Mutex<Vec<MockReply>>>,
    repeating: Arc<Mutex<Option<MockReply>>>,
    pub requests: Arc<Mutex<Vec<LlmRequest>>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text reply.
    pub fn with_reply(self, text: &str) -> Self {
        self.replies.lock().push(MockReply::text(text));
        self
    }

    /// Queue a single-tool-call reply.
    pub fn with_tool_call(self, name: &str, args: &[(&str, &str)]) -> Self {
        self.replies.lock().push(MockReply::tool_call(name, args));
        self
    }

    /// Queue a fully custom reply.
    pub fn with_mock_reply(self, reply: MockReply) -> Self {
        self.replies.lock().push(reply);
        self
    }

    /// Queue an error reply.
    pub fn with_error(self, message: &str) -> Self {
        self.replies.lock().push(MockReply {
            error: Some(message.into()),
            ..Default::default()
        });
        self
    }

    /// Return this reply forever once the queue runs dry. Used to exercise
    /// the iteration ceiling.
    pub fn with_repeating_tool_call(self, name: &str, args: &[(&str, &str)]) -> Self {
        *self.repeating.lock() = Some(MockReply::tool_call(name, args));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(&self) -> MockReply {
        let mut replies = self.replies.lock();
        if replies.is_empty() {
            if let Some(repeating) = self.repeating.lock().clone() {
                // Re-mint tool call ids so each iteration gets distinct ones.
                let mut reply = repeating;
                reply.tool_calls = reply
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        let args: Vec<(&str, &str)> = tc
                            .arguments
                            .iter()
                            .map(|(k, v)| (k.as_str(), v.as_str()))
                            .collect();
                        ToolCall::new(&tc.name, &args)
                    })
                    .collect();
                return reply;
            }
            MockReply::text("(mock: no more queued replies)")
        } else {
            replies.remove(0)
        }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn send_message(&self, request: &LlmRequest) -> Result<LlmReply> {
        self.requests.lock().push(request.clone());
        let reply = self.next_reply();

        if let Some(error) = reply.error {
            return Err(WardenError::Llm(error));
        }

        Ok(LlmReply {
            content: if reply.text.is_empty() {
                None
            } else {
                Some(reply.text)
            },
            tool_calls: reply.tool_calls,
            finish_reason: reply.finish_reason,
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
        })
    }

    async fn send_message_stream(
        &self,
        request: &LlmRequest,
    ) -> Result<mpsc::Receiver<LlmChunk>> {
        self.requests.lock().push(request.clone());
        let reply = self.next_reply();
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            if let Some(error) = reply.error {
                let _ = tx.send(LlmChunk::ContentDelta(format!("Error: {error}"))).await;
                let _ = tx.send(LlmChunk::Done(FinishReason::Error)).await;
                return;
            }
            for word in reply.text.split_inclusive(' ') {
                let _ = tx.send(LlmChunk::ContentDelta(word.to_string())).await;
            }
            for tc in reply.tool_calls {
                let _ = tx.send(LlmChunk::ToolCallDelta(tc)).await;
            }
            let _ = tx.send(LlmChunk::Done(reply.finish_reason)).await;
        });

        Ok(rx)
    }
}
